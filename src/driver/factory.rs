use crate::configuration::constants::common::{DESKTOP, MOBILE};
use crate::driver::{Device, Session};
use crate::error::{DriverError, SessionError};
use derivative::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const DRIVER_TYPE_KEY: &'static str = "driver_type";
const PLATFORM_NAME_KEY: &'static str = "platformName";

/// Desired capabilities of a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    values: BTreeMap<String, String>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Explicit `driver_type`, else derived from the platform, else `fallback`.
    pub fn driver_type(&self, fallback: &str) -> String {
        if let Some(driver_type) = self.get(DRIVER_TYPE_KEY) {
            return driver_type.to_ascii_lowercase();
        }
        match self.get(PLATFORM_NAME_KEY).map(str::to_ascii_lowercase) {
            Some(platform) if platform == "android" || platform == "ios" => MOBILE.to_owned(),
            _ => fallback.to_ascii_lowercase(),
        }
    }
}

/// Creates sessions of one driver type.
pub trait SessionFactory: Send + Sync {
    fn create(
        &self,
        name: &str,
        device: Option<&Device>,
        capabilities: &Capabilities,
    ) -> Result<Arc<dyn Session>, DriverError>;
}

/// Observes sessions produced by the factory.
pub trait SessionListener: Send + Sync {
    fn enabled(&self) -> bool {
        true
    }

    fn on_created(&self, _session: &dyn Session) {}

    fn before_quit(&self, _session: &dyn Session) {}
}

pub type ListenerConstructor = fn() -> Arc<dyn SessionListener>;

struct ListenedSession {
    inner: Arc<dyn Session>,
    listeners: Vec<Arc<dyn SessionListener>>,
}

impl Session for ListenedSession {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn quit(&self) -> Result<(), SessionError> {
        for listener in &self.listeners {
            listener.before_quit(self.inner.as_ref());
        }
        self.inner.quit()
    }
}

/// Dispatches session creation to the factory registered for the driver type.
#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct DriverFactory {
    default_type: String,
    #[derivative(Debug = "ignore")]
    factories: HashMap<String, Box<dyn SessionFactory>>,
    #[derivative(Debug = "ignore")]
    listeners: Vec<Arc<dyn SessionListener>>,
}

impl DriverFactory {
    pub fn new(default_type: &str) -> Self {
        Self {
            default_type: default_type.to_owned(),
            ..Self::default()
        }
    }

    pub fn with_factory(mut self, driver_type: &str, factory: Box<dyn SessionFactory>) -> Self {
        self.factories.insert(driver_type.to_ascii_lowercase(), factory);
        self
    }

    /// Instantiates the listeners named by `keys`; unknown and disabled ones are skipped.
    pub fn with_listeners(
        mut self,
        keys: &[String],
        constructors: &HashMap<String, ListenerConstructor>,
    ) -> Self {
        for key in keys {
            match constructors.get(key) {
                Some(constructor) => {
                    let listener = constructor();
                    if listener.enabled() {
                        debug!("Session listener registered: {}", key);
                        self.listeners.push(listener);
                    } else {
                        debug!("Session listener '{}' is disabled", key);
                    }
                }
                None => error!("Unable to register session listener '{}': unknown key", key),
            }
        }
        self
    }

    pub fn create(
        &self,
        name: &str,
        device: Option<&Device>,
        capabilities: &Capabilities,
    ) -> Result<Arc<dyn Session>, DriverError> {
        let fallback = if self.default_type.is_empty() {
            DESKTOP
        } else {
            self.default_type.as_str()
        };
        let driver_type = capabilities.driver_type(fallback);
        debug!("Creating '{}' driver of type {}", name, driver_type);

        let factory = self
            .factories
            .get(&driver_type)
            .ok_or(DriverError::UnsupportedType { driver_type })?;
        let session = factory.create(name, device, capabilities)?;
        if self.listeners.is_empty() {
            return Ok(session);
        }

        for listener in &self.listeners {
            listener.on_created(session.as_ref());
        }
        Ok(Arc::new(ListenedSession {
            inner: session,
            listeners: self.listeners.clone(),
        }))
    }
}

/// Logs session creation and teardown.
#[derive(Debug, Default)]
pub struct LoggingSessionListener;

impl SessionListener for LoggingSessionListener {
    fn on_created(&self, session: &dyn Session) {
        info!("Session {} created", session.id());
    }

    fn before_quit(&self, session: &dyn Session) {
        debug!("Session {} is about to quit", session.id());
    }
}

fn logging_listener() -> Arc<dyn SessionListener> {
    Arc::new(LoggingSessionListener)
}

/// Session listeners available by `driver_event_listeners` key.
pub fn default_listeners() -> HashMap<String, ListenerConstructor> {
    let mut constructors: HashMap<String, ListenerConstructor> = HashMap::new();
    constructors.insert("logging".to_owned(), logging_listener);
    constructors
}
