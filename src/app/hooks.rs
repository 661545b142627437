use crate::app::{ConfigurationKind, SuiteContext, TestInfo};
use crate::configuration::settings::Configuration;
use crate::outcome::{SuiteResult, TestResultItem};
use std::collections::HashMap;

/// Extra behaviour chained after the listener's own handling of each callback.
pub trait LifecycleObserver: Send + Sync {
    fn on_start(&self, _suite: &SuiteContext) {}

    fn before_configuration(&self, _kind: ConfigurationKind) {}

    fn on_test_start(&self, _test: &TestInfo) {}

    fn on_test_finish(&self, _result: &TestResultItem) {}

    fn on_finish(&self, _suite: &SuiteContext, _result: Option<SuiteResult>) {}
}

/// Expected-skip rule consulted when a test starts.
pub trait SkipPolicy: Send + Sync {
    /// Reason to skip the test, if any.
    fn should_skip(&self, test: &TestInfo) -> Option<String>;
}

impl<F> SkipPolicy for F
where
    F: Fn(&TestInfo) -> Option<String> + Send + Sync,
{
    fn should_skip(&self, test: &TestInfo) -> Option<String> {
        self(test)
    }
}

pub type ObserverConstructor = fn(&Configuration) -> Box<dyn LifecycleObserver>;

/// Observers available by configuration key (`listeners`).
pub struct ObserverRegistry {
    constructors: HashMap<String, ObserverConstructor>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new().register("logging", LoggingObserver::boxed)
    }

    pub fn register(mut self, key: &str, constructor: ObserverConstructor) -> Self {
        self.constructors.insert(key.to_owned(), constructor);
        self
    }

    /// Observers for `keys` in the given order; unknown keys are reported and skipped.
    pub fn build(&self, keys: &[String], configuration: &Configuration) -> Vec<Box<dyn LifecycleObserver>> {
        keys.iter()
            .filter_map(|key| match self.constructors.get(key) {
                Some(constructor) => {
                    debug!("Lifecycle observer registered: {}", key);
                    Some(constructor(configuration))
                }
                None => {
                    error!("Unable to register lifecycle observer '{}': unknown key", key);
                    None
                }
            })
            .collect()
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Logs every lifecycle callback at debug level.
pub struct LoggingObserver;

impl LoggingObserver {
    fn boxed(_configuration: &Configuration) -> Box<dyn LifecycleObserver> {
        Box::new(LoggingObserver)
    }
}

impl LifecycleObserver for LoggingObserver {
    fn on_start(&self, suite: &SuiteContext) {
        debug!("Suite '{}' started with {} thread(s)", suite.name, suite.thread_count);
    }

    fn before_configuration(&self, kind: ConfigurationKind) {
        debug!("Configuration {:?} starting", kind);
    }

    fn on_test_start(&self, test: &TestInfo) {
        debug!("Test {}.{} started", test.class, test.name);
    }

    fn on_test_finish(&self, result: &TestResultItem) {
        debug!(
            "Test {}.{} finished: {}",
            result.class(),
            result.test(),
            result.status().name()
        );
    }

    fn on_finish(&self, suite: &SuiteContext, result: Option<SuiteResult>) {
        match result {
            Some(result) => debug!("Suite '{}' finished: {}", suite.name, result),
            None => debug!("Suite '{}' finished with finalization errors", suite.name),
        }
    }
}
