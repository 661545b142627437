//! Health check gating a suite behind a nested test run.
//!
//! The nested runner only reports tests it actually executed, so a method
//! name that matches nothing disappears silently. When methods are named the
//! gate therefore requires exactly that many passes.

use crate::configuration::constants::parameter::{HEALTH_CHECK_CLASS, HEALTH_CHECK_METHODS};
use crate::configuration::deserialize::comma_list;
use crate::configuration::settings::Configuration;
use crate::error::{RunnerError, SuiteAbort};
use std::collections::HashMap;

/// Single-class test run to execute as a health check.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheckPlan {
    pub class_name: String,
    /// `None` runs every method of the class.
    pub methods: Option<Vec<String>>,
}

/// Pass/fail/skip counts reported by a nested run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunCounts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Executes a plan synchronously and reports its counts.
pub trait NestedRunner: Send + Sync {
    fn run(&self, plan: &HealthCheckPlan) -> Result<RunCounts, RunnerError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheckResult {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub expected: Option<usize>,
}

impl HealthCheckResult {
    pub fn new(counts: RunCounts, expected: Option<usize>) -> Self {
        Self {
            passed: counts.passed,
            failed: counts.failed,
            skipped: counts.skipped,
            expected,
        }
    }

    /// Expected pass count, `-1` when every method of the class was eligible.
    pub fn expected_count(&self) -> i64 {
        self.expected.map(|v| v as i64).unwrap_or(-1)
    }

    pub fn is_passed(&self) -> bool {
        if self.failed > 0 || self.skipped > 0 {
            return false;
        }
        match self.expected {
            Some(expected) => self.passed == expected,
            None => self.passed > 0,
        }
    }
}

impl HealthCheckPlan {
    /// Builds the plan from suite parameters, which override configuration.
    /// `None` when no class is configured.
    pub fn resolve(configuration: &Configuration, suite_parameters: &HashMap<String, String>) -> Option<Self> {
        let class_name = suite_parameters
            .get(HEALTH_CHECK_CLASS)
            .unwrap_or(&configuration.health_check_class)
            .trim()
            .to_owned();
        if class_name.is_empty() {
            return None;
        }
        let methods = suite_parameters
            .get(HEALTH_CHECK_METHODS)
            .unwrap_or(&configuration.health_check_methods);
        let methods = comma_list::split(methods);

        Some(Self {
            class_name,
            methods: if methods.is_empty() { None } else { Some(methods) },
        })
    }

    pub fn expected_count(&self) -> Option<usize> {
        self.methods.as_ref().map(Vec::len)
    }
}

pub struct HealthCheckGate {
    runner: Box<dyn NestedRunner>,
}

impl HealthCheckGate {
    pub fn new(runner: Box<dyn NestedRunner>) -> Self {
        Self { runner }
    }

    /// Runs the configured health check, if any, and decides whether the suite may proceed.
    pub fn check(
        &self,
        configuration: &Configuration,
        suite_parameters: &HashMap<String, String>,
    ) -> Result<Option<HealthCheckResult>, SuiteAbort> {
        let plan = match HealthCheckPlan::resolve(configuration, suite_parameters) {
            Some(plan) => plan,
            None => {
                debug!("No health check class configured");
                return Ok(None);
            }
        };
        self.run(&plan).map(Some)
    }

    pub fn run(&self, plan: &HealthCheckPlan) -> Result<HealthCheckResult, SuiteAbort> {
        info!("HealthCheck '{}' is started", plan.class_name);
        debug!("HealthCheck plan: {:?}", plan);

        let counts = self.runner.run(plan).map_err(|source| SuiteAbort::Runner {
            class_name: plan.class_name.clone(),
            source,
        })?;
        let result = HealthCheckResult::new(counts, plan.expected_count());
        if let Some(expected) = result.expected {
            info!("Expected passed tests count: {}", expected);
        }

        if result.is_passed() {
            info!("HealthCheck suite '{}' is finished successfully", plan.class_name);
            Ok(result)
        } else {
            warn!(
                "HealthCheck '{}' failed: passed={}, failed={}, skipped={}, expected={}",
                plan.class_name,
                result.passed,
                result.failed,
                result.skipped,
                result.expected_count()
            );
            Err(SuiteAbort::HealthCheck {
                message: format!(
                    "Skip test(s) due to health check failures for '{}'",
                    plan.class_name
                ),
            })
        }
    }
}
