use crate::app::SuiteContext;
use crate::configuration::constants::cargo_env::CARGO_PKG_NAME;
use clap::arg_enum;
use log::LevelFilter;
use std::path::PathBuf;
use structopt::StructOpt;

arg_enum! {
    #[derive(Debug)]
    pub enum LogLevel {
        Off, Error, Warn, Info, Debug, Trace,
    }
}

#[derive(StructOpt, Debug)]
#[structopt(name = CARGO_PKG_NAME)]
pub struct Opt {
    /// Set a custom configuration file. Supported: YAML, JSON, TOML, HJSON
    #[structopt(parse(from_os_str))]
    pub file: Option<PathBuf>,

    /// Sets a logging level
    #[structopt(case_insensitive = true, long, short = "L", possible_values = &LogLevel::variants(), env = "LOG_LEVEL")]
    pub logging: Option<LogLevel>,

    /// FIle to which application will write logs
    #[structopt(long, short = "O", env = "LOG_OUTPUT_FILE")]
    pub log_output_file: Option<PathBuf>,

    /// Name of the suite being gated
    #[structopt(long, short = "s", default_value = "Default suite")]
    pub suite: String,

    /// Suite file the outer runner was started with
    #[structopt(long, parse(from_os_str))]
    pub suite_file: Option<PathBuf>,

    /// Suite parameter in form key=value, overrides configuration where supported
    #[structopt(long = "param", short = "p", number_of_values = 1, parse(try_from_str = parse_key_value))]
    pub params: Vec<(String, String)>,
}

impl Opt {
    /// Suite description as the outer runner would report it.
    pub fn suite_context(&self) -> SuiteContext {
        let mut suite = self
            .params
            .iter()
            .fold(SuiteContext::new(&self.suite), |suite, (key, value)| {
                suite.with_parameter(key, value)
            });
        suite.file_name = self
            .suite_file
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned());
        suite
    }
}

impl Into<LevelFilter> for LogLevel {
    fn into(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.find('=') {
        Some(pos) if pos > 0 => Ok((s[..pos].trim().to_owned(), s[pos + 1..].to_owned())),
        _ => Err(format!("Expected key=value, got '{}'", s)),
    }
}
