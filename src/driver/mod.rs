pub mod factory;
pub mod registry;

use crate::app::phase::Phase;
use crate::error::SessionError;
use derivative::*;
use std::fmt;
use std::sync::Arc;

/// Live remote browser/device automation session.
pub trait Session: Send + Sync {
    fn id(&self) -> &str;

    /// Releases the remote session. May block on network teardown.
    fn quit(&self) -> Result<(), SessionError>;
}

/// Device a mobile session is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub name: String,
    pub os: String,
    pub os_version: String,
    pub udid: String,
}

impl Device {
    pub fn new(name: &str, os: &str, os_version: &str, udid: &str) -> Self {
        Self {
            name: name.to_owned(),
            os: os.to_owned(),
            os_version: os_version.to_owned(),
            udid: udid.to_owned(),
        }
    }

    /// Report descriptor, `"Desktop"` when no device is bound.
    pub fn describe(device: Option<&Device>) -> String {
        match device {
            Some(device) => device.to_string(),
            None => "Desktop".to_owned(),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} - {} {}", self.name, self.os, self.os_version)
    }
}

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct DriverHandle {
    name: String,
    #[derivative(Debug = "ignore")]
    session: Arc<dyn Session>,
    phase: Phase,
    device: Option<Device>,
}

impl DriverHandle {
    pub fn new(name: &str, session: Arc<dyn Session>, phase: Phase, device: Option<Device>) -> Self {
        Self {
            name: name.to_owned(),
            session,
            phase,
            device,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn device(&self) -> Option<&Device> {
        self.device.as_ref()
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Quits the underlying session, logging instead of propagating failures.
    pub(crate) fn release(self) {
        debug!(
            "Quitting driver '{}' (session {}, phase {})",
            self.name,
            self.session.id(),
            self.phase
        );
        match self.session.quit() {
            Ok(()) => info!("Driver '{}' has been quit", self.name),
            Err(e) => warn!("Unable to quit driver '{}': {}", self.name, e),
        }
    }
}
