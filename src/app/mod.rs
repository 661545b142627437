pub mod bootstrap;
pub mod context;
pub mod coordinator;
pub mod finalizer;
pub mod health;
pub mod hooks;
pub mod phase;

pub use self::context::{ConfigurationKind, SuiteContext, TestInfo, TestStart};

use crate::app::bootstrap::Bootstrap;
use crate::app::coordinator::LifecycleCoordinator;
use crate::app::finalizer::SuiteFinalizer;
use crate::app::health::{HealthCheckGate, NestedRunner};
use crate::app::hooks::{LifecycleObserver, ObserverRegistry, SkipPolicy};
use crate::artifact::mirror::DirectoryBuckets;
use crate::artifact::ArtifactResolver;
use crate::configuration::settings::Configuration;
use crate::driver::factory::DriverFactory;
use crate::driver::registry::DriverPool;
use crate::error::{FinalizeError, SuiteAbort};
use crate::outcome::{ResultCollector, SkipReason, SuiteResult, TestResultItem};
use crate::reporter::json::JsonReportSink;
use crate::reporter::ReportSink;
use crate::runner;
use crate::tickets::{NoopTracker, TicketTracker};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Entry point the outer runner calls on every lifecycle event.
///
/// One instance serves the whole suite and every worker thread. The host keeps
/// a single listener per process: bootstrap and the health check run once per
/// listener, so a second instance would repeat them.
pub struct Listener {
    configuration: RwLock<Configuration>,
    bootstrap: Bootstrap,
    coordinator: LifecycleCoordinator,
    gate: HealthCheckGate,
    artifacts: ArtifactResolver,
    collector: ResultCollector,
    tickets: Box<dyn TicketTracker>,
    report: Box<dyn ReportSink>,
    skip_policies: Vec<Box<dyn SkipPolicy>>,
    observers: Vec<Box<dyn LifecycleObserver>>,
}

impl Listener {
    pub fn new(configuration: Configuration, factory: DriverFactory) -> Self {
        let gate = HealthCheckGate::new(runner::from_configuration(&configuration));
        let artifacts = match &configuration.artifact_mirror {
            Some(root) => ArtifactResolver::new().with_buckets(Box::new(DirectoryBuckets::new(root.clone()))),
            None => ArtifactResolver::new(),
        };
        let report = Box::new(JsonReportSink::new(configuration.report_dir.clone()));
        let observers = ObserverRegistry::with_defaults().build(&configuration.listeners, &configuration);
        Self {
            coordinator: LifecycleCoordinator::new(Arc::new(DriverPool::new()), factory),
            bootstrap: Bootstrap::new(),
            collector: ResultCollector::new(),
            tickets: Box::new(NoopTracker),
            skip_policies: vec![],
            configuration: RwLock::new(configuration),
            gate,
            artifacts,
            report,
            observers,
        }
    }

    pub fn with_runner(mut self, runner: Box<dyn NestedRunner>) -> Self {
        self.gate = HealthCheckGate::new(runner);
        self
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactResolver) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn with_tickets(mut self, tickets: Box<dyn TicketTracker>) -> Self {
        self.tickets = tickets;
        self
    }

    pub fn with_report(mut self, report: Box<dyn ReportSink>) -> Self {
        self.report = report;
        self
    }

    pub fn with_skip_policy(mut self, policy: Box<dyn SkipPolicy>) -> Self {
        self.skip_policies.push(policy);
        self
    }

    /// Rebuilds the observer list from the configured `listeners` keys.
    pub fn with_observers(mut self, registry: &ObserverRegistry) -> Self {
        let configuration = self.read_configuration().clone();
        self.observers = registry.build(&configuration.listeners, &configuration);
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn coordinator(&self) -> &LifecycleCoordinator {
        &self.coordinator
    }

    pub fn collector(&self) -> &ResultCollector {
        &self.collector
    }

    /// Snapshot of the configuration as updated by the bootstrap.
    pub fn configuration(&self) -> Configuration {
        self.read_configuration().clone()
    }

    /// Suite entry. Process-wide preparation runs once; an aborted
    /// preparation aborts every suite that starts afterwards.
    pub fn on_start(&self, suite: &mut SuiteContext) -> Result<(), SuiteAbort> {
        self.bootstrap.ensure_initialized(|| self.initialize(suite))?;
        for observer in &self.observers {
            observer.on_start(suite);
        }
        Ok(())
    }

    fn initialize(&self, suite: &mut SuiteContext) -> Result<(), SuiteAbort> {
        let mut configuration = self.write_configuration();
        debug!("Initiated configuration {:#?}", *configuration);
        configuration.validate()?;
        bootstrap::apply_thread_counts(&mut configuration, suite);
        self.artifacts.update_app_path(&mut configuration);

        if let Some(result) = self.gate.check(&configuration, &suite.parameters)? {
            info!(
                "HealthCheck passed: {} passed, {} skipped",
                result.passed, result.skipped
            );
        }
        Ok(())
    }

    pub fn before_configuration(&self, kind: ConfigurationKind) {
        match kind {
            ConfigurationKind::BeforeSuite => self.coordinator.on_before_suite(),
            ConfigurationKind::BeforeClass => self.coordinator.on_before_class(),
            ConfigurationKind::BeforeMethod => self.coordinator.on_before_method(),
            ConfigurationKind::AfterMethod => self.coordinator.on_after_method(),
            ConfigurationKind::AfterClass => self.coordinator.on_after_class(),
            ConfigurationKind::AfterSuite => self.coordinator.on_after_suite(),
        }
        for observer in &self.observers {
            observer.before_configuration(kind);
        }
    }

    /// Driver cleanup for the new test. Nothing runs after an aborted
    /// bootstrap; otherwise the first skip policy that objects wins.
    pub fn on_test_start(&self, test: &TestInfo) -> TestStart {
        self.coordinator.on_test_start(test.has_dependencies());

        let decision = if let Some(message) = self.bootstrap.failure() {
            TestStart::Skip(SkipReason::HealthCheckFailed(message))
        } else {
            match self.skip_policies.iter().find_map(|policy| policy.should_skip(test)) {
                Some(reason) => {
                    info!("Skipping {}.{}: {}", test.class, test.name, reason);
                    TestStart::Skip(SkipReason::Deliberate(reason))
                }
                None => TestStart::Run,
            }
        };
        for observer in &self.observers {
            observer.on_test_start(test);
        }
        decision
    }

    pub fn on_test_finish(&self, mut result: TestResultItem) {
        if !result.status().is_sentinel() {
            match self.tickets.tickets_for(&result) {
                Ok(tickets) => result.set_tickets(tickets),
                Err(e) => error!("Unable to read tickets for {}: {}", result.test(), e),
            }
            if let Err(e) = self.tickets.update_after_test(&result) {
                error!("Unable to update tickets for {}: {}", result.test(), e);
            }
            self.tickets.clear_tickets();
        }
        for observer in &self.observers {
            observer.on_test_finish(&result);
        }
        self.collector.push(result);
    }

    pub fn on_finish(&self, suite: &SuiteContext) -> Result<SuiteResult, FinalizeError> {
        let items = self.collector.items();
        let result = {
            let configuration = self.read_configuration();
            SuiteFinalizer::new(&self.coordinator, self.tickets.as_ref(), self.report.as_ref())
                .finish(suite, &configuration, &items)
        };
        let classified = match &result {
            Ok(result) => Some(*result),
            Err(e) if e.skip_all => Some(SuiteResult::SkipAll),
            Err(_) => None,
        };
        for observer in &self.observers {
            observer.on_finish(suite, classified);
        }
        result
    }

    fn read_configuration(&self) -> RwLockReadGuard<Configuration> {
        self.configuration.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_configuration(&self) -> RwLockWriteGuard<Configuration> {
        self.configuration.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::app::health::{HealthCheckPlan, RunCounts};
    use crate::driver::factory::{Capabilities, SessionFactory};
    use crate::driver::fake::FakeSession;
    use crate::driver::{Device, Session};
    use crate::error::{DriverError, RunnerError};
    use crate::outcome::{item, TestStatus};
    use crate::reporter::SuiteReport;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeFactory;

    impl SessionFactory for FakeFactory {
        fn create(
            &self,
            name: &str,
            _device: Option<&Device>,
            _capabilities: &Capabilities,
        ) -> Result<Arc<dyn Session>, DriverError> {
            Ok(Arc::new(FakeSession::new(name)))
        }
    }

    struct CountingRunner {
        counts: RunCounts,
        runs: Arc<AtomicUsize>,
    }

    impl NestedRunner for CountingRunner {
        fn run(&self, _plan: &HealthCheckPlan) -> Result<RunCounts, RunnerError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(self.counts)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        reports: Mutex<Vec<SuiteReport>>,
    }

    impl ReportSink for Arc<RecordingSink> {
        fn emit(&self, report: &SuiteReport) -> Result<PathBuf, String> {
            self.reports.lock().unwrap().push(report.clone());
            Ok(PathBuf::from("suite-report.json"))
        }
    }

    #[derive(Default)]
    struct RecordingTracker {
        updates: Mutex<Vec<String>>,
    }

    impl TicketTracker for Arc<RecordingTracker> {
        fn tickets_for(&self, _result: &TestResultItem) -> Result<Vec<String>, String> {
            Ok(vec!["JIRA-1".to_owned()])
        }

        fn update_after_test(&self, result: &TestResultItem) -> Result<(), String> {
            self.updates.lock().unwrap().push(result.test().to_owned());
            Ok(())
        }

        fn update_after_suite(&self, _suite: &SuiteContext, _results: &[TestResultItem]) -> Result<(), String> {
            Ok(())
        }

        fn clear_tickets(&self) {}
    }

    struct FinishObserver {
        seen: Arc<Mutex<Vec<Option<SuiteResult>>>>,
    }

    impl LifecycleObserver for FinishObserver {
        fn on_finish(&self, _suite: &SuiteContext, result: Option<SuiteResult>) {
            self.seen.lock().unwrap().push(result);
        }
    }

    fn listener(configuration: Configuration) -> (Listener, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let factory = DriverFactory::new("desktop").with_factory("desktop", Box::new(FakeFactory));
        let listener = Listener::new(configuration, factory).with_report(Box::new(sink.clone()));
        (listener, sink)
    }

    fn health_check_configuration() -> Configuration {
        let mut configuration = Configuration::default();
        configuration.health_check_class = "smoke::HealthCheck".to_owned();
        configuration.health_check_methods = "ping".to_owned();
        configuration
    }

    fn passing_runner(runs: &Arc<AtomicUsize>) -> Box<CountingRunner> {
        Box::new(CountingRunner {
            counts: RunCounts {
                passed: 1,
                failed: 0,
                skipped: 0,
            },
            runs: runs.clone(),
        })
    }

    #[test]
    fn test_health_check_runs_once_per_listener() {
        let runs = Arc::new(AtomicUsize::new(0));
        let (listener, _) = listener(health_check_configuration());
        let listener = Arc::new(listener.with_runner(passing_runner(&runs)));

        let suites: Vec<_> = (0..4)
            .map(|i| {
                let listener = listener.clone();
                std::thread::spawn(move || listener.on_start(&mut SuiteContext::new(&format!("Suite {}", i))))
            })
            .collect();
        for suite in suites {
            suite.join().unwrap().unwrap();
        }
        listener.on_start(&mut SuiteContext::new("Last")).unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_listener_bootstraps_again() {
        let runs = Arc::new(AtomicUsize::new(0));
        let (first, _) = listener(health_check_configuration());
        let (second, _) = listener(health_check_configuration());
        let first = first.with_runner(passing_runner(&runs));
        let second = second.with_runner(passing_runner(&runs));

        first.on_start(&mut SuiteContext::new("First")).unwrap();
        second.on_start(&mut SuiteContext::new("Second")).unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_health_check_aborts_every_suite() {
        let runner = CountingRunner {
            counts: RunCounts {
                passed: 0,
                failed: 1,
                skipped: 0,
            },
            runs: Arc::new(AtomicUsize::new(0)),
        };
        let (listener, _) = listener(health_check_configuration());
        let listener = listener.with_runner(Box::new(runner));

        let first = listener.on_start(&mut SuiteContext::new("First"));
        let second = listener.on_start(&mut SuiteContext::new("Second"));

        assert!(matches!(first, Err(SuiteAbort::HealthCheck { .. })));
        assert!(matches!(second, Err(SuiteAbort::Bootstrap { .. })));
        assert_eq!(
            listener.on_test_start(&TestInfo::new("Login", "valid")),
            TestStart::Skip(SkipReason::HealthCheckFailed(
                "Skip test(s) due to health check failures for 'smoke::HealthCheck'".to_owned()
            ))
        );
    }

    #[test]
    fn test_invalid_configuration_aborts_start() {
        let mut configuration = Configuration::default();
        configuration.driver_type = "tv".to_owned();
        let (listener, _) = listener(configuration);

        let result = listener.on_start(&mut SuiteContext::new("Regression"));

        assert!(matches!(result, Err(SuiteAbort::Configuration(_))));
    }

    #[test]
    fn test_on_start_applies_thread_counts() {
        let mut configuration = Configuration::default();
        configuration.thread_count = 4;
        let (listener, _) = listener(configuration);
        let mut suite = SuiteContext::new("Regression");
        suite.data_provider_thread_count = 2;

        listener.on_start(&mut suite).unwrap();

        assert_eq!(suite.thread_count, 4);
        assert_eq!(listener.configuration().data_provider_thread_count, 2);
    }

    #[test]
    fn test_skip_policy_decides_test_start() {
        let (listener, _) = listener(Configuration::default());
        let listener = listener.with_skip_policy(Box::new(|test: &TestInfo| {
            if test.name.starts_with("flaky") {
                Some("known issue".to_owned())
            } else {
                None
            }
        }));

        assert_eq!(listener.on_test_start(&TestInfo::new("Login", "valid")), TestStart::Run);
        assert_eq!(
            listener.on_test_start(&TestInfo::new("Login", "flaky_logout")),
            TestStart::Skip(SkipReason::Deliberate("known issue".to_owned()))
        );
    }

    #[test]
    fn test_sentinel_results_bypass_ticket_updates() {
        let tracker = Arc::new(RecordingTracker::default());
        let (listener, _) = listener(Configuration::default());
        let listener = listener.with_tickets(Box::new(tracker.clone()));

        listener.on_test_finish(item("passed", TestStatus::Passed));
        listener.on_test_finish(item("rerun", TestStatus::Skipped(SkipReason::AlreadyPassed)));
        listener.on_test_finish(item(
            "expected",
            TestStatus::Skipped(SkipReason::Deliberate("known issue".to_owned())),
        ));
        listener.on_test_finish(item(
            "gated",
            TestStatus::Skipped(SkipReason::HealthCheckFailed("smoke".to_owned())),
        ));

        assert_eq!(
            *tracker.updates.lock().unwrap(),
            vec!["passed".to_owned(), "gated".to_owned()]
        );
        let items = listener.collector().items();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].tickets(), &["JIRA-1".to_owned()][..]);
        assert!(items[1].tickets().is_empty());
    }

    #[test]
    fn test_configuration_events_drive_driver_cleanup() {
        let (listener, _) = listener(Configuration::default());
        listener.before_configuration(ConfigurationKind::BeforeClass);
        listener
            .coordinator()
            .open_driver("class", &Capabilities::new(), None)
            .unwrap();

        listener.before_configuration(ConfigurationKind::AfterClass);

        assert!(listener.coordinator().pool().is_empty());
    }

    #[test]
    fn test_on_finish_drains_and_reports() {
        let (listener, sink) = listener(Configuration::default());
        listener.on_test_start(&TestInfo::new("Login", "valid"));
        listener.coordinator().get_driver("default").unwrap();
        listener.on_test_finish(item("valid", TestStatus::Passed));

        let result = listener.on_finish(&SuiteContext::new("Regression"));

        assert_eq!(result.unwrap(), SuiteResult::Pass);
        assert!(listener.coordinator().pool().is_empty());
        assert_eq!(sink.reports.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_skip_all_is_reported_to_observers() {
        let seen = Arc::new(Mutex::new(vec![]));
        let (listener, sink) = listener(Configuration::default());
        let listener = listener.with_observer(Box::new(FinishObserver { seen: seen.clone() }));

        let error = listener.on_finish(&SuiteContext::new("Regression")).unwrap_err();

        assert!(error.skip_all);
        assert_eq!(*seen.lock().unwrap(), vec![Some(SuiteResult::SkipAll)]);
        assert_eq!(sink.reports.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_dependent_test_keeps_prerequisite_driver() {
        let (listener, _) = listener(Configuration::default());
        listener.on_test_start(&TestInfo::new("Cart", "login"));
        listener.coordinator().get_driver("session").unwrap();

        listener.on_test_start(&TestInfo::new("Cart", "checkout").depending_on(&["login"]));
        assert!(listener.coordinator().pool().lookup("session").is_ok());

        listener.on_test_start(&TestInfo::new("Cart", "browse"));
        assert!(listener.coordinator().pool().lookup("session").is_err());
    }

    #[test]
    fn test_suite_parameter_enables_health_check() {
        let runs = Arc::new(AtomicUsize::new(0));
        let runner = CountingRunner {
            counts: RunCounts {
                passed: 1,
                failed: 0,
                skipped: 0,
            },
            runs: runs.clone(),
        };
        let (listener, _) = listener(Configuration::default());
        let listener = listener.with_runner(Box::new(runner));
        let mut suite = SuiteContext::new("Regression").with_parameter("health_check_class", "smoke::HealthCheck");

        listener.on_start(&mut suite).unwrap();

        assert_eq!(suite.parameter("health_check_class"), Some("smoke::HealthCheck"));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
