//! Per-runner mutable state.

use homerunner_domain::history::{HistoryAction, HistoryEntry, HistoryRing};
use homerunner_domain::time::Timestamp;

/// A deferred action waiting for its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub description: String,
    pub due_at: Timestamp,
}

/// Everything a runner knows about itself.
///
/// Owned by exactly one runner task and mutated only from its own steps;
/// observers receive clones.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerState {
    pub running: bool,
    /// Last value read from the watched entity, `None` before the first
    /// successful poll.
    pub last_observed_state: Option<String>,
    pub consecutive_errors: u32,
    pub consecutive_successes: u64,
    pub last_successful_poll_at: Option<Timestamp>,
    pub pending_action: Option<PendingAction>,
    /// Start of the most recent corrective action; drives cooldowns.
    pub last_action_attempt_at: Option<Timestamp>,
    pub history: HistoryRing,
}

impl RunnerState {
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self {
            running: true,
            last_observed_state: None,
            consecutive_errors: 0,
            consecutive_successes: 0,
            last_successful_poll_at: None,
            pending_action: None,
            last_action_attempt_at: None,
            history: HistoryRing::with_capacity(history_capacity),
        }
    }

    pub fn record(&mut self, at: Timestamp, action: HistoryAction, detail: impl Into<String>) {
        self.history.push(HistoryEntry::new(at, action, detail));
    }

    pub fn record_entry(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    pub fn poll_succeeded(&mut self, at: Timestamp) {
        self.consecutive_errors = 0;
        self.consecutive_successes += 1;
        self.last_successful_poll_at = Some(at);
    }

    /// Returns the new consecutive error count.
    pub fn poll_failed(&mut self) -> u32 {
        self.consecutive_successes = 0;
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.consecutive_errors
    }
}
