use crate::configuration::constants::capabilities::OVERLAYS;
use crate::configuration::constants::common::{DESKTOP, ENV_PREFIX, MOBILE};
use crate::error::ConfigurationError;
use config::{Config, ConfigError, Environment, File};
use log::LevelFilter;
use serde_derive::Deserialize;
use std::path::PathBuf;

/// Process-wide settings of the listener layer.
///
/// Loaded once from an optional file plus `WARDEN_*` environment variables.
/// `mobile_app` and `app_version` are rewritten by artifact resolution during
/// bootstrap; everything else is read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub env: Option<String>,
    pub url: String,
    pub browser: String,
    pub app_version: String,
    pub mobile_app: String,
    pub suite_name: String,
    pub email_title: String,
    pub thread_count: usize,
    pub data_provider_thread_count: i64,
    pub health_check_class: String,
    pub health_check_methods: String,
    pub health_check_command: Option<String>,
    #[serde(deserialize_with = "crate::configuration::deserialize::comma_list::deserialize")]
    pub health_check_args: Vec<String>,
    pub access_key_id: String,
    pub hockeyapp_token: String,
    pub s3_local_storage: PathBuf,
    pub hockeyapp_local_storage: PathBuf,
    pub artifact_mirror: Option<PathBuf>,
    #[serde(deserialize_with = "crate::configuration::deserialize::level_filter::deserialize")]
    pub core_log_level: LevelFilter,
    pub driver_type: String,
    #[serde(deserialize_with = "crate::configuration::deserialize::comma_list::deserialize")]
    pub driver_event_listeners: Vec<String>,
    #[serde(deserialize_with = "crate::configuration::deserialize::comma_list::deserialize")]
    pub listeners: Vec<String>,
    pub report_dir: PathBuf,
    pub custom_capabilities: String,
    pub extra_capabilities: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            env: None,
            url: String::new(),
            browser: String::new(),
            app_version: String::new(),
            mobile_app: String::new(),
            suite_name: String::new(),
            email_title: "Test execution report".to_owned(),
            thread_count: 1,
            data_provider_thread_count: -1,
            health_check_class: String::new(),
            health_check_methods: String::new(),
            health_check_command: None,
            health_check_args: Vec::new(),
            access_key_id: String::new(),
            hockeyapp_token: String::new(),
            s3_local_storage: PathBuf::from("./s3"),
            hockeyapp_local_storage: PathBuf::from("./hockeyapp"),
            artifact_mirror: None,
            core_log_level: LevelFilter::Info,
            driver_type: DESKTOP.to_owned(),
            driver_event_listeners: Vec::new(),
            listeners: Vec::new(),
            report_dir: PathBuf::from("./reports"),
            custom_capabilities: String::new(),
            extra_capabilities: String::new(),
        }
    }
}

impl Configuration {
    pub fn from(file: Option<PathBuf>) -> Result<Self, ConfigurationError> {
        let configuration: Self = Self::load(file)?;
        configuration.validate()?;
        Ok(configuration)
    }

    fn load(file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Config::new();
        if let Some(file) = file {
            config.merge(File::from(file))?;
        }
        config.merge(Environment::with_prefix(ENV_PREFIX))?;

        for key in OVERLAYS.iter() {
            let overlay = match config.get_str(key) {
                Ok(path) => path.trim().to_owned(),
                Err(_) => continue,
            };
            if overlay.is_empty() {
                continue;
            }
            info!("Redefining configuration properties from {} '{}'", key, overlay);
            config.merge(File::from(PathBuf::from(overlay)))?;
        }

        config.try_into()
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let driver_type = self.driver_type.to_ascii_lowercase();
        if driver_type != DESKTOP && driver_type != MOBILE {
            return Err(ConfigurationError::Invalid {
                field: "driver_type".to_owned(),
                value: self.driver_type.clone(),
            });
        }
        if self.thread_count == 0 {
            return Err(ConfigurationError::Invalid {
                field: "thread_count".to_owned(),
                value: self.thread_count.to_string(),
            });
        }
        Ok(())
    }

    /// Environment shown in report titles, falling back to the tested url.
    pub fn env_or_url(&self) -> &str {
        match &self.env {
            Some(env) => env.as_str(),
            None => self.url.as_str(),
        }
    }

    /// Environment description embedded in the suite report.
    pub fn env_description(&self) -> String {
        let mut env = self.env.clone().unwrap_or_default();
        if !self.url.is_empty() {
            env += &format!(" - <a href='{}'>{}</a>", self.url, self.url);
        }
        env
    }
}
