use crate::app::coordinator::LifecycleCoordinator;
use crate::app::SuiteContext;
use crate::configuration::settings::Configuration;
use crate::error::FinalizeError;
use crate::outcome::{SuiteResult, TestResultItem};
use crate::reporter::{self, ReportSink, SuiteReport};
use crate::tickets::TicketTracker;
use chrono::Local;
use std::panic::{self, AssertUnwindSafe};

const SKIP_ALL_MESSAGE: &'static str =
    "All tests were skipped! Analyze logs to determine possible configuration issues.";

/// Runs once when the outer suite completes.
///
/// Each step is attempted even if an earlier one failed or panicked; the
/// failures are reported together at the end.
pub struct SuiteFinalizer<'a> {
    coordinator: &'a LifecycleCoordinator,
    tickets: &'a dyn TicketTracker,
    report: &'a dyn ReportSink,
}

impl<'a> SuiteFinalizer<'a> {
    pub fn new(
        coordinator: &'a LifecycleCoordinator,
        tickets: &'a dyn TicketTracker,
        report: &'a dyn ReportSink,
    ) -> Self {
        Self {
            coordinator,
            tickets,
            report,
        }
    }

    pub fn finish(
        &self,
        suite: &SuiteContext,
        configuration: &Configuration,
        items: &[TestResultItem],
    ) -> Result<SuiteResult, FinalizeError> {
        let mut failures = vec![];

        attempt("driver drain", &mut failures, || {
            self.coordinator.drain_all();
            Ok(())
        });

        let result = SuiteResult::classify(items);
        info!("Suite '{}' result: {}", suite.name, result);

        attempt("ticket update", &mut failures, || {
            self.tickets.update_after_suite(suite, items)
        });

        attempt("report generation", &mut failures, || {
            debug!("Generating suite report...");
            let device = self.coordinator.last_device();
            let report = SuiteReport {
                title: format!(
                    "{}: {}",
                    result.name(),
                    reporter::title(configuration, suite, &device)
                ),
                env: configuration.env_description(),
                app_version: configuration.app_version.clone(),
                device,
                browser: configuration.browser.clone(),
                generated_at: Local::now(),
                result,
                items: items.to_vec(),
            };
            let path = self.report.emit(&report)?;
            info!("Suite report generated: {}", path.display());
            Ok(())
        });

        attempt("execution summary", &mut failures, || {
            reporter::print_execution_summary(items);
            Ok(())
        });

        let skip_all = match result {
            SuiteResult::SkipAll => {
                error!("{}", SKIP_ALL_MESSAGE);
                true
            }
            SuiteResult::SkipAllAlreadyPassed => {
                info!("Nothing was executed in rerun mode because all tests already passed in a previous run");
                false
            }
            _ => false,
        };

        if failures.is_empty() && !skip_all {
            Ok(result)
        } else {
            Err(FinalizeError { skip_all, failures })
        }
    }
}

fn attempt<F>(step: &str, failures: &mut Vec<String>, f: F)
where
    F: FnOnce() -> Result<(), String>,
{
    let outcome = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(outcome) => outcome,
        Err(_) => Err("panicked".to_owned()),
    };
    if let Err(e) = outcome {
        error!("Suite finalization step '{}' failed: {}", step, e);
        failures.push(format!("{}: {}", step, e));
    }
}
