use crate::app::SuiteContext;
use crate::configuration::settings::Configuration;
use crate::error::SuiteAbort;
use std::sync::Mutex;

/// Runs initialization exactly once per instance, however many times and
/// from however many threads the entry hook fires. Callers arriving while
/// initialization runs wait for it; a failed initialization is replayed to
/// every later caller.
///
/// The guard is owned by the [`Listener`](crate::app::Listener); the host keeps
/// one listener per process, which makes this a once-per-process guard.
#[derive(Debug, Default)]
pub struct Bootstrap {
    state: Mutex<Option<Result<(), String>>>,
}

impl Bootstrap {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Ok(true)` when this call performed the initialization.
    pub fn ensure_initialized<F>(&self, init: F) -> Result<bool, SuiteAbort>
    where
        F: FnOnce() -> Result<(), SuiteAbort>,
    {
        let mut state = lock!(self.state);
        match &*state {
            Some(Ok(())) => {
                debug!("Do nothing as suite bootstrap already initialized");
                Ok(false)
            }
            Some(Err(message)) => Err(SuiteAbort::Bootstrap {
                message: message.clone(),
            }),
            None => {
                let result = init();
                *state = Some(result.as_ref().map(|_| ()).map_err(ToString::to_string));
                result.map(|_| true)
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        lock!(self.state).is_some()
    }

    /// Message of the failed initialization, if it failed.
    pub fn failure(&self) -> Option<String> {
        match &*lock!(self.state) {
            Some(Err(message)) => Some(message.clone()),
            _ => None,
        }
    }
}

/// Pushes configured thread counts into the suite. A non-positive
/// data-provider count keeps the suite's own value and syncs it back.
pub fn apply_thread_counts(configuration: &mut Configuration, suite: &mut SuiteContext) {
    debug!("Default thread_count={}", suite.thread_count);
    if configuration.thread_count > 0 {
        suite.thread_count = configuration.thread_count;
    }
    debug!("Updated thread_count={}", suite.thread_count);

    if configuration.data_provider_thread_count > 0 {
        debug!(
            "Updated 'data_provider_thread_count' from {} to {}",
            suite.data_provider_thread_count, configuration.data_provider_thread_count
        );
        suite.data_provider_thread_count = configuration.data_provider_thread_count as usize;
    } else {
        debug!("Synching data_provider_thread_count with values from suite...");
        configuration.data_provider_thread_count = suite.data_provider_thread_count as i64;
    }
}
