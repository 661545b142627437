use crate::outcome::SkipReason;
use std::collections::HashMap;

/// What the outer runner tells the listener about the suite.
#[derive(Debug, Clone, Default)]
pub struct SuiteContext {
    pub name: String,
    /// Path of the suite definition file, if the suite came from one.
    pub file_name: Option<String>,
    /// Suite-level parameters; they take precedence over configuration.
    pub parameters: HashMap<String, String>,
    pub thread_count: usize,
    pub data_provider_thread_count: usize,
}

impl SuiteContext {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            thread_count: 1,
            data_provider_thread_count: 1,
            ..Self::default()
        }
    }

    pub fn with_parameter(mut self, key: &str, value: &str) -> Self {
        self.parameters.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

/// Test method about to run.
#[derive(Debug, Clone, PartialEq)]
pub struct TestInfo {
    pub class: String,
    pub name: String,
    /// Methods this test depends upon.
    pub depends_on: Vec<String>,
}

impl TestInfo {
    pub fn new(class: &str, name: &str) -> Self {
        Self {
            class: class.to_owned(),
            name: name.to_owned(),
            depends_on: Vec::new(),
        }
    }

    pub fn depending_on(mut self, methods: &[&str]) -> Self {
        self.depends_on = methods.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn has_dependencies(&self) -> bool {
        !self.depends_on.is_empty()
    }
}

/// Configuration callback kinds of the outer runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationKind {
    BeforeSuite,
    BeforeClass,
    BeforeMethod,
    AfterMethod,
    AfterClass,
    AfterSuite,
}

/// Decision handed back to the runner when a test starts.
#[derive(Debug, Clone, PartialEq)]
pub enum TestStart {
    Run,
    Skip(SkipReason),
}
