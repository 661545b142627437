//! Suite report hand-off.
//!
//! Rendering belongs to the sink; this module only assembles what goes into
//! the report and prints the execution summary.

pub mod json;
pub mod serialize;

use crate::app::SuiteContext;
use crate::configuration::constants::common::DEFAULT_SUITE_NAME;
use crate::configuration::settings::Configuration;
use crate::outcome::{SuiteResult, TestResultItem};
use chrono::{DateTime, Local};
use serde_derive::Serialize;
use std::path::PathBuf;

pub use self::json::JsonReportSink;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    pub title: String,
    pub env: String,
    pub app_version: String,
    pub device: String,
    pub browser: String,
    #[serde(with = "crate::reporter::serialize::local_datetime")]
    pub generated_at: DateTime<Local>,
    pub result: SuiteResult,
    pub items: Vec<TestResultItem>,
}

/// Persists a rendered suite report and returns where it was written.
pub trait ReportSink: Send + Sync {
    fn emit(&self, report: &SuiteReport) -> Result<PathBuf, String>;
}

/// Suite name shown in titles. The runner's placeholder name is never used.
pub fn suite_name(configuration: &Configuration, suite: &SuiteContext) -> String {
    if !configuration.suite_name.is_empty() {
        configuration.suite_name.clone()
    } else if suite.name != DEFAULT_SUITE_NAME && !suite.name.is_empty() {
        suite.name.clone()
    } else {
        configuration.email_title.clone()
    }
}

/// Short name of the suite file, `"undefined"` when the suite has none.
///
/// Both separators count; a name without any is already short and is
/// returned whole.
pub fn suite_file_name(suite: &SuiteContext) -> String {
    let file_name = match &suite.file_name {
        Some(file_name) => file_name.replace('\\', "/"),
        None => return "undefined".to_owned(),
    };
    trace!("Full suite file name: {}", file_name);
    match file_name.rfind('/') {
        Some(pos) => file_name[pos + 1..].to_owned(),
        None => file_name,
    }
}

/// `"<version - ><suite> (<file>) - <env> (<device><browser>)"`
pub fn title(configuration: &Configuration, suite: &SuiteContext, device: &str) -> String {
    let app_version = if configuration.app_version.is_empty() {
        String::new()
    } else {
        format!("{} - ", configuration.app_version)
    };
    let browser = if configuration.browser.is_empty() {
        String::new()
    } else {
        format!(" {}", configuration.browser)
    };
    format!(
        "{}{} ({}) - {} ({}{})",
        app_version,
        suite_name(configuration, suite),
        suite_file_name(suite),
        configuration.env_or_url(),
        device,
        browser
    )
}

/// Numbered summary lines, skipping configuration items and sentinel skips.
pub fn execution_summary(items: &[TestResultItem]) -> Vec<String> {
    items
        .iter()
        .filter(|item| !item.is_config() && !item.status().is_sentinel())
        .enumerate()
        .map(|(i, item)| {
            let mut links = String::new();
            if let Some(screenshots) = item.link_to_screenshots().filter(|v| !v.is_empty()) {
                links += &format!("screenshots={} | ", screenshots);
            }
            if let Some(log) = item.link_to_log().filter(|v| !v.is_empty()) {
                links += &format!("log={}", log);
            }
            format!("[{}] {}: {} {}", i + 1, item.test(), item.status().name(), links)
                .trim_end()
                .to_owned()
        })
        .collect()
}

pub fn print_execution_summary(items: &[TestResultItem]) {
    info!("**************** Test execution summary ****************");
    for line in execution_summary(items) {
        info!("{}", line);
    }
}
