//! Ticket tracker collaborator (JIRA-like).

use crate::app::SuiteContext;
use crate::outcome::TestResultItem;

pub trait TicketTracker: Send + Sync {
    fn tickets_for(&self, result: &TestResultItem) -> Result<Vec<String>, String>;

    fn update_after_test(&self, result: &TestResultItem) -> Result<(), String>;

    fn update_after_suite(&self, suite: &SuiteContext, results: &[TestResultItem]) -> Result<(), String>;

    /// Forgets tickets bound to the current test so the next one starts clean.
    fn clear_tickets(&self);
}

/// Tracker used when no ticket integration is configured.
#[derive(Debug, Default)]
pub struct NoopTracker;

impl TicketTracker for NoopTracker {
    fn tickets_for(&self, _result: &TestResultItem) -> Result<Vec<String>, String> {
        Ok(Vec::new())
    }

    fn update_after_test(&self, _result: &TestResultItem) -> Result<(), String> {
        Ok(())
    }

    fn update_after_suite(&self, _suite: &SuiteContext, _results: &[TestResultItem]) -> Result<(), String> {
        Ok(())
    }

    fn clear_tickets(&self) {}
}
