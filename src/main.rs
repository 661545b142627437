// #![forbid(unsafe_code)]
// #![deny(non_upper_case_globals)]
// #![deny(non_camel_case_types)]
// #![deny(non_snake_case)]
// #![deny(unused_mut)]
// #![deny(unused_variables)]
// #![deny(dead_code)]
// #![deny(unused_imports)]
//#![deny(missing_docs)]
//#![deny(warnings)]

extern crate chrono;
extern crate warden;

#[macro_use]
extern crate log;

use log::LevelFilter;
use signal_hook::{iterator::Signals, SIGINT};
use std::{path::PathBuf, process::exit, thread};
use structopt::StructOpt;

use warden::configuration::command_line::{LogLevel, Opt};
use warden::configuration::constants::cargo_env::CARGO_PKG_NAME;
use warden::driver::factory::{default_listeners, DriverFactory};
use warden::{Configuration, Listener};

const EXIT_CONFIGURATION_ERROR: i32 = 1;
const EXIT_SUITE_ABORTED: i32 = 2;

/// Runs the suite preparation the listener performs on suite start
/// (thread counts, application binary resolution and the health check)
/// and reports through the exit code whether the suite may proceed.
fn main() {
    let mut options = Opt::from_args();
    let signals = match Signals::new(&[SIGINT]) {
        Ok(signals) => signals,
        Err(e) => {
            eprintln!("Unable to register signal handler: {}", e);
            exit(EXIT_CONFIGURATION_ERROR);
        }
    };

    thread::spawn(move || {
        for sig in signals.forever() {
            info!("Received signal {:?}, stopping", sig);
            exit(0);
        }
    });

    let configuration = Configuration::from(options.file.clone());

    init_logging(
        options.logging.take().unwrap_or(LogLevel::Info).into(),
        configuration
            .as_ref()
            .map(|c| c.core_log_level)
            .unwrap_or(LevelFilter::Info),
        &options.log_output_file,
    );

    let configuration = match configuration {
        Ok(configuration) => configuration,
        Err(e) => {
            error!("Failed to load configuration {}", e);
            exit(EXIT_CONFIGURATION_ERROR);
        }
    };

    let mut suite = options.suite_context();
    let factory = DriverFactory::new(&configuration.driver_type)
        .with_listeners(&configuration.driver_event_listeners, &default_listeners());
    let listener = Listener::new(configuration, factory);

    match listener.on_start(&mut suite) {
        Ok(()) => {
            let configuration = listener.configuration();
            info!(
                "Suite '{}' may proceed: thread_count={}, data_provider_thread_count={}, mobile_app='{}'",
                suite.name, suite.thread_count, suite.data_provider_thread_count, configuration.mobile_app
            );
        }
        Err(e) => {
            error!("{}", e);
            exit(EXIT_SUITE_ABORTED);
        }
    }
}

fn init_logging(level: LevelFilter, core_level: LevelFilter, output: &Option<PathBuf>) {
    let mut dispatcher = fern::Dispatch::new()
        // Perform allocation-free log formatting
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}:{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record
                    .line()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "".to_owned()),
                record.level(),
                message
            ))
        })
        .level(level)
        .level_for(CARGO_PKG_NAME, core_level)
        .chain(std::io::stdout());

    if let Some(log_file) = output {
        match fern::log_file(log_file) {
            Ok(file) => dispatcher = dispatcher.chain(file),
            Err(e) => eprintln!("Unable to open log file {:?}: {}", log_file, e),
        }
    }
    if let Err(e) = dispatcher.apply() {
        eprintln!("Unable to initialize logging: {}", e);
    }
    info!("Logging level {} enabled", level);
}
