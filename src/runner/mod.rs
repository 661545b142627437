//! Nested runners used by the health-check gate.

pub mod libtest;

use crate::app::health::{HealthCheckPlan, NestedRunner, RunCounts};
use crate::configuration::settings::Configuration;
use crate::error::RunnerError;

pub use self::libtest::LibtestRunner;

/// Stands in when no health-check command is configured.
#[derive(Debug, Default)]
pub struct MissingRunner;

impl NestedRunner for MissingRunner {
    fn run(&self, plan: &HealthCheckPlan) -> Result<RunCounts, RunnerError> {
        Err(RunnerError::NotConfigured(format!(
            "health_check_command is required to run '{}'",
            plan.class_name
        )))
    }
}

pub fn from_configuration(configuration: &Configuration) -> Box<dyn NestedRunner> {
    match &configuration.health_check_command {
        Some(program) if !program.trim().is_empty() => Box::new(LibtestRunner::new(
            program.trim(),
            configuration.health_check_args.clone(),
        )),
        _ => Box::new(MissingRunner),
    }
}
