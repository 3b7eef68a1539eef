//! Event log port: append-only sink for runner events.

use std::future::Future;

use homerunner_domain::error::HomeRunnerError;
use homerunner_domain::event::EventLogEntry;
use homerunner_domain::id::AutomationId;

/// Append-only store of [`EventLogEntry`] records.
pub trait EventLog {
    /// Persist a new entry.
    fn append(
        &self,
        entry: EventLogEntry,
    ) -> impl Future<Output = Result<EventLogEntry, HomeRunnerError>> + Send;

    /// Most recent entries of one automation, newest first.
    fn recent_for_automation(
        &self,
        automation_id: AutomationId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<EventLogEntry>, HomeRunnerError>> + Send;
}
