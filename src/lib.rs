// #![forbid(unsafe_code)]
// #![deny(non_upper_case_globals)]
// #![deny(non_camel_case_types)]
// #![deny(non_snake_case)]
// #![deny(unused_mut)]
//#![deny(missing_docs)]
//#![deny(warnings)]

//! Listener layer for UI/API test suites.
//!
//! Keeps per-thread driver sessions tied to the lifecycle phase that opened
//! them, gates a suite behind a nested health-check run, resolves the mobile
//! application binary before the suite starts and finalizes the suite once
//! every test has been recorded.

extern crate chrono;
extern crate derivative;
extern crate lazy_static;
extern crate serde_derive;

#[macro_use]
extern crate log;

#[macro_use]
extern crate derive_builder;

macro_rules! lock {
    ($name: expr) => {
        match $name.lock() {
            Ok(locked) => locked,
            Err(poisoned) => {
                warn!("Recovering poisoned lock: {}", stringify!($name));
                poisoned.into_inner()
            }
        }
    };
}

pub mod app;
pub mod artifact;
pub mod configuration;
pub mod driver;
pub mod error;
pub mod outcome;
pub mod reporter;
pub mod runner;
pub mod tickets;

pub use self::app::coordinator::LifecycleCoordinator;
pub use self::app::health::{HealthCheckGate, HealthCheckPlan, HealthCheckResult, NestedRunner};
pub use self::app::phase::Phase;
pub use self::app::{ConfigurationKind, Listener, SuiteContext, TestInfo, TestStart};
pub use self::configuration::settings::Configuration;
pub use self::driver::registry::{DriverPool, DriverRegistry};
pub use self::driver::{Device, DriverHandle, Session};
pub use self::outcome::{SkipReason, SuiteResult, TestResultItem, TestStatus};
