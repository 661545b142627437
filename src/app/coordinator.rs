use crate::app::phase::{self, Phase};
use crate::driver::factory::{Capabilities, DriverFactory};
use crate::driver::registry::DriverPool;
use crate::driver::{Device, DriverHandle};
use crate::error::DriverError;
use std::sync::{Arc, Mutex};

/// Applies the driver cleanup rules on every lifecycle transition.
///
/// All rules act on the calling thread's drivers only, except the forced
/// drain at suite end. Every rule works on a snapshot taken before any driver
/// is quit.
pub struct LifecycleCoordinator {
    pool: Arc<DriverPool>,
    factory: DriverFactory,
    last_device: Mutex<Option<Device>>,
}

impl LifecycleCoordinator {
    pub fn new(pool: Arc<DriverPool>, factory: DriverFactory) -> Self {
        Self {
            pool,
            factory,
            last_device: Mutex::new(None),
        }
    }

    /// Descriptor of the device most recently bound to a driver, for reports.
    pub fn last_device(&self) -> String {
        Device::describe(lock!(self.last_device).as_ref())
    }

    pub fn pool(&self) -> &Arc<DriverPool> {
        &self.pool
    }

    pub fn on_before_suite(&self) {
        phase::set_active_phase(Phase::BeforeSuite);
    }

    /// A new class starts on this thread: class-scoped drivers of the previous one are stale.
    pub fn on_before_class(&self) {
        phase::set_active_phase(Phase::BeforeClass);
        self.quit_in_phase(Phase::BeforeClass);
    }

    pub fn on_before_method(&self) {
        phase::set_active_phase(Phase::BeforeMethod);
        debug!("Deinitialize unused driver(s) on before test method start");
        self.quit_in_phase(Phase::Method);
    }

    /// Test body starts. Tests depending on other methods keep the drivers
    /// their prerequisites left behind.
    pub fn on_test_start(&self, has_dependencies: bool) {
        phase::set_active_phase(Phase::Method);
        if has_dependencies {
            debug!("Test declares dependencies, drivers are kept");
            return;
        }

        let snapshot = self.pool.snapshot();
        for entry in snapshot.in_phase(Phase::Method) {
            self.quit_driver(&entry.name);
        }
        for entry in snapshot.in_phase(Phase::BeforeMethod) {
            trace!("Promoting driver '{}' to {}", entry.name, Phase::Method);
            if let Err(e) = self.pool.set_phase(&entry.name, Phase::Method) {
                warn!("{}", e);
            }
        }
    }

    pub fn on_after_method(&self) {
        phase::set_active_phase(Phase::AfterMethod);
    }

    pub fn on_after_class(&self) {
        phase::set_active_phase(Phase::AfterClass);
        self.quit_in_phase(Phase::BeforeClass);
    }

    pub fn on_after_suite(&self) {
        phase::set_active_phase(Phase::AfterSuite);
    }

    /// Opens a session and registers it under the active phase of this thread.
    pub fn open_driver(
        &self,
        name: &str,
        capabilities: &Capabilities,
        device: Option<Device>,
    ) -> Result<DriverHandle, DriverError> {
        if self.pool.lookup(name).is_ok() {
            return Err(DriverError::Duplicate {
                name: name.to_owned(),
            });
        }
        let phase = phase::active_phase().unwrap_or(Phase::Method);
        let session = self.factory.create(name, device.as_ref(), capabilities)?;
        if let Some(device) = &device {
            *lock!(self.last_device) = Some(device.clone());
        }
        let handle = DriverHandle::new(name, session, phase, device);
        if let Err(e) = self.pool.register(handle.clone()) {
            handle.release();
            return Err(e);
        }
        info!("Driver '{}' opened in phase {}", name, phase);
        Ok(handle)
    }

    /// Existing driver of this thread, or a new one with default capabilities.
    pub fn get_driver(&self, name: &str) -> Result<DriverHandle, DriverError> {
        match self.pool.lookup(name) {
            Ok(handle) => Ok(handle),
            Err(DriverError::NotFound { .. }) => self.open_driver(name, &Capabilities::new(), None),
            Err(e) => Err(e),
        }
    }

    /// Releases and forgets one driver of this thread. Unknown names are ignored.
    pub fn quit_driver(&self, name: &str) {
        match self.pool.remove(name) {
            Ok(handle) => handle.release(),
            Err(_) => trace!("Driver '{}' is not registered, nothing to quit", name),
        }
    }

    /// Quits every driver of the calling thread regardless of phase.
    pub fn quit_drivers(&self) {
        for handle in self.pool.drain_current() {
            handle.release();
        }
    }

    /// Forced drain: quits every remaining driver of every thread.
    pub fn drain_all(&self) -> usize {
        let handles = self.pool.drain_all();
        let count = handles.len();
        if count > 0 {
            info!("Forcibly quitting {} remaining driver(s)", count);
        }
        for handle in handles {
            handle.release();
        }
        count
    }

    fn quit_in_phase(&self, phase: Phase) {
        let snapshot = self.pool.snapshot();
        for entry in snapshot.in_phase(phase) {
            self.quit_driver(&entry.name);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::factory::SessionFactory;
    use crate::driver::fake::FakeSession;
    use crate::driver::Session;
    use std::sync::atomic::Ordering;
    use std::thread;

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

    struct UnreachableGrid;

    impl SessionFactory for UnreachableGrid {
        fn create(
            &self,
            name: &str,
            _device: Option<&Device>,
            _capabilities: &Capabilities,
        ) -> Result<Arc<dyn Session>, DriverError> {
            Err(DriverError::Creation {
                name: name.to_owned(),
                message: "grid unreachable".to_owned(),
            })
        }
    }

    fn coordinator() -> LifecycleCoordinator {
        let factory = DriverFactory::new("desktop").with_factory("desktop", Box::new(FakeFactory));
        LifecycleCoordinator::new(Arc::new(DriverPool::new()), factory)
    }

    fn open(coordinator: &LifecycleCoordinator, name: &str) {
        coordinator.open_driver(name, &Capabilities::new(), None).unwrap();
    }

    fn alive(coordinator: &LifecycleCoordinator, name: &str) -> bool {
        coordinator.pool().lookup(name).is_ok()
    }

    #[test]
    fn test_driver_takes_active_phase() {
        let coordinator = coordinator();
        coordinator.on_before_class();
        open(&coordinator, "class");
        coordinator.on_before_method();
        open(&coordinator, "method");

        assert_eq!(coordinator.pool().lookup("class").unwrap().phase(), Phase::BeforeClass);
        assert_eq!(coordinator.pool().lookup("method").unwrap().phase(), Phase::BeforeMethod);
    }

    #[test]
    fn test_last_device_is_remembered() {
        let coordinator = coordinator();
        coordinator.on_test_start(false);
        assert_eq!(coordinator.last_device(), "Desktop");

        let device = Device::new("iPhone 12", "iOS", "15.2", "00008101");
        coordinator
            .open_driver("mobile", &Capabilities::new(), Some(device))
            .unwrap();

        assert_eq!(coordinator.last_device(), "iPhone 12 - iOS 15.2");
    }

    #[test]
    fn test_open_duplicate_driver_fails() {
        let coordinator = coordinator();
        coordinator.on_test_start(false);
        open(&coordinator, "default");

        let result = coordinator.open_driver("default", &Capabilities::new(), None);

        assert!(matches!(result, Err(DriverError::Duplicate { .. })));
    }

    #[test]
    fn test_get_driver_reuses_existing() {
        let coordinator = coordinator();
        coordinator.on_test_start(false);
        let first = coordinator.get_driver("default").unwrap();
        let second = coordinator.get_driver("default").unwrap();

        assert_eq!(first.session().id(), second.session().id());
        assert_eq!(coordinator.pool().len(), 1);
    }

    #[test]
    fn test_before_class_quits_stale_class_drivers() {
        let coordinator = coordinator();
        coordinator.on_before_class();
        open(&coordinator, "class");
        coordinator.on_test_start(false);
        open(&coordinator, "method");

        coordinator.on_before_class();

        assert!(!alive(&coordinator, "class"));
        assert!(alive(&coordinator, "method"));
    }

    #[test]
    fn test_before_method_quits_method_drivers() {
        let coordinator = coordinator();
        coordinator.on_test_start(false);
        open(&coordinator, "method");
        coordinator.on_before_method();

        assert!(!alive(&coordinator, "method"));
    }

    #[test]
    fn test_before_method_driver_never_spans_two_independent_tests() {
        let coordinator = coordinator();
        coordinator.on_before_method();
        open(&coordinator, "setup");

        coordinator.on_test_start(false);
        assert_eq!(coordinator.pool().lookup("setup").unwrap().phase(), Phase::Method);

        coordinator.on_after_method();
        coordinator.on_test_start(false);
        assert!(!alive(&coordinator, "setup"));
    }

    #[test]
    fn test_dependent_test_reuses_prerequisite_driver() {
        let coordinator = coordinator();
        coordinator.on_test_start(false);
        open(&coordinator, "login");
        coordinator.on_after_method();

        coordinator.on_test_start(true);

        assert!(alive(&coordinator, "login"));
        assert_eq!(coordinator.pool().lookup("login").unwrap().phase(), Phase::Method);
    }

    #[test]
    fn test_after_class_quits_class_drivers_only() {
        let coordinator = coordinator();
        coordinator.on_before_class();
        open(&coordinator, "class");
        coordinator.on_test_start(false);
        open(&coordinator, "method");

        coordinator.on_after_class();

        assert!(!alive(&coordinator, "class"));
        assert!(alive(&coordinator, "method"));
    }

    #[test]
    fn test_broken_session_is_still_removed() {
        let coordinator = coordinator();
        phase::set_active_phase(Phase::Method);
        let session = FakeSession::broken("broken");
        let quits = session.quits();
        coordinator
            .pool()
            .register(DriverHandle::new("broken", Arc::new(session), Phase::Method, None))
            .unwrap();

        coordinator.quit_driver("broken");
        coordinator.quit_driver("broken");

        assert_eq!(quits.load(Ordering::SeqCst), 1);
        assert!(!alive(&coordinator, "broken"));
    }

    #[test]
    fn test_quit_drivers_releases_calling_thread_only() {
        let coordinator = Arc::new(coordinator());
        coordinator.on_before_class();
        open(&coordinator, "class");
        coordinator.on_test_start(false);
        open(&coordinator, "method");

        let worker = {
            let coordinator = coordinator.clone();
            thread::spawn(move || {
                phase::set_active_phase(Phase::Method);
                open(&coordinator, "worker");
            })
        };
        worker.join().unwrap();
        assert_eq!(coordinator.pool().len(), 3);

        coordinator.quit_drivers();

        assert!(coordinator.pool().snapshot().is_empty());
        assert_eq!(coordinator.pool().len(), 1);
        assert_eq!(coordinator.drain_all(), 1);
    }

    #[test]
    fn test_failed_session_creation_registers_nothing() {
        let factory = DriverFactory::new("desktop").with_factory("desktop", Box::new(UnreachableGrid));
        let coordinator = LifecycleCoordinator::new(Arc::new(DriverPool::new()), factory);
        coordinator.on_test_start(false);

        let device = Device::new("Pixel 6", "Android", "13", "emulator-5554");
        let result = coordinator.open_driver("mobile", &Capabilities::new(), Some(device));

        match result {
            Err(DriverError::Creation { name, message }) => {
                assert_eq!(name, "mobile");
                assert_eq!(message, "grid unreachable");
            }
            _ => panic!("expected session creation error"),
        }
        assert!(coordinator.pool().is_empty());
        assert_eq!(coordinator.last_device(), "Desktop");
    }

    #[test]
    fn test_forced_drain_reaches_every_thread() {
        let coordinator = Arc::new(coordinator());
        let phases = [
            Phase::BeforeSuite,
            Phase::BeforeClass,
            Phase::BeforeMethod,
            Phase::Method,
            Phase::AfterMethod,
            Phase::AfterClass,
        ];
        let workers: Vec<_> = phases
            .iter()
            .enumerate()
            .map(|(i, phase)| {
                let coordinator = coordinator.clone();
                let phase = *phase;
                thread::spawn(move || {
                    phase::set_active_phase(phase);
                    open(&coordinator, &format!("driver-{}", i));
                    coordinator.on_test_start(true);
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(coordinator.pool().len(), phases.len());

        coordinator.on_after_suite();
        let drained = coordinator.drain_all();

        assert_eq!(drained, phases.len());
        assert!(coordinator.pool().is_empty());
    }
}
