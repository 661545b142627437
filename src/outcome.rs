//! Test outcomes and the suite-wide result collector.

use chrono::{DateTime, Local};
use serde_derive::Serialize;
use std::fmt;
use std::sync::Mutex;

/// Why a test did not run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// Already recorded as passed by a previous run of the same suite.
    AlreadyPassed,
    /// Skipped on purpose by an expected-skip rule.
    Deliberate(String),
    HealthCheckFailed(String),
    Other(String),
}

impl SkipReason {
    /// Sentinel skips are neither ticketed nor listed in the execution summary.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, SkipReason::AlreadyPassed | SkipReason::Deliberate(_))
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SkipReason::AlreadyPassed => f.write_str("Already passed in a previous run"),
            SkipReason::Deliberate(message) => write!(f, "Skip execution: {}", message),
            SkipReason::HealthCheckFailed(message) => write!(f, "Health check failed: {}", message),
            SkipReason::Other(message) => f.write_str(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    Passed,
    Failed(String),
    Skipped(SkipReason),
}

impl TestStatus {
    pub fn name(&self) -> &'static str {
        match self {
            TestStatus::Passed => "PASS",
            TestStatus::Failed(_) => "FAIL",
            TestStatus::Skipped(_) => "SKIP",
        }
    }

    pub fn is_sentinel(&self) -> bool {
        match self {
            TestStatus::Skipped(reason) => reason.is_sentinel(),
            _ => false,
        }
    }

    pub fn fail_reason(&self) -> Option<String> {
        match self {
            TestStatus::Passed => None,
            TestStatus::Failed(reason) => Some(reason.clone()),
            TestStatus::Skipped(reason) => Some(reason.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct TestResultItem {
    test: String,
    #[builder(default = "String::new()")]
    class: String,
    status: TestStatus,
    #[builder(default = "false")]
    is_config: bool,
    #[builder(default = "Vec::new()")]
    tickets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default = "None")]
    link_to_log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default = "None")]
    link_to_screenshots: Option<String>,
    #[serde(with = "crate::reporter::serialize::local_datetime")]
    #[builder(default = "Local::now()")]
    finished_at: DateTime<Local>,
}

impl TestResultItem {
    pub fn builder() -> TestResultItemBuilder {
        TestResultItemBuilder::default()
    }

    pub fn test(&self) -> &str {
        &self.test
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn status(&self) -> &TestStatus {
        &self.status
    }

    pub fn is_config(&self) -> bool {
        self.is_config
    }

    pub fn tickets(&self) -> &[String] {
        &self.tickets
    }

    pub fn set_tickets(&mut self, tickets: Vec<String>) {
        self.tickets = tickets;
    }

    pub fn link_to_log(&self) -> Option<&str> {
        self.link_to_log.as_deref()
    }

    pub fn link_to_screenshots(&self) -> Option<&str> {
        self.link_to_screenshots.as_deref()
    }
}

/// Aggregate classification of a whole suite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuiteResult {
    Pass,
    Skip,
    Fail,
    SkipAll,
    SkipAllAlreadyPassed,
}

impl SuiteResult {
    pub fn name(&self) -> &'static str {
        match self {
            SuiteResult::Pass => "PASS",
            SuiteResult::Skip => "SKIP",
            SuiteResult::Fail => "FAIL",
            SuiteResult::SkipAll => "SKIP_ALL",
            SuiteResult::SkipAllAlreadyPassed => "SKIP_ALL_ALREADY_PASSED",
        }
    }

    /// Classifies every non-configuration item. A run where nothing passed or
    /// failed is a skip-all, unless every skip was an already-passed rerun.
    pub fn classify(items: &[TestResultItem]) -> SuiteResult {
        let (mut passed, mut failed, mut skipped, mut already_passed) = (0, 0, 0, 0);
        for item in items.iter().filter(|item| !item.is_config()) {
            match item.status() {
                TestStatus::Passed => passed += 1,
                TestStatus::Failed(_) => failed += 1,
                TestStatus::Skipped(SkipReason::AlreadyPassed) => already_passed += 1,
                TestStatus::Skipped(_) => skipped += 1,
            }
        }

        if failed > 0 {
            SuiteResult::Fail
        } else if passed == 0 && skipped == 0 && already_passed > 0 {
            SuiteResult::SkipAllAlreadyPassed
        } else if passed == 0 {
            SuiteResult::SkipAll
        } else if skipped > 0 {
            SuiteResult::Skip
        } else {
            SuiteResult::Pass
        }
    }
}

impl fmt::Display for SuiteResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Suite-wide result list appended to by every worker thread.
#[derive(Debug, Default)]
pub struct ResultCollector {
    items: Mutex<Vec<TestResultItem>>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: TestResultItem) {
        lock!(self.items).push(item);
    }

    pub fn items(&self) -> Vec<TestResultItem> {
        lock!(self.items).clone()
    }

    pub fn len(&self) -> usize {
        lock!(self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        lock!(self.items).is_empty()
    }
}

#[cfg(test)]
pub(crate) fn item(test: &str, status: TestStatus) -> TestResultItem {
    TestResultItem::builder()
        .test(test.to_owned())
        .class("Suite".to_owned())
        .status(status)
        .build()
        .unwrap()
}
