//! Error budget and log throttling shared by both runners.

use homerunner_domain::error::DeviceError;
use homerunner_domain::event::EventType;
use homerunner_domain::history::{HistoryAction, HistoryEntry};
use homerunner_domain::time::Timestamp;

use super::Effect;
use super::state::RunnerState;

/// How many consecutive failed polls a runner tolerates before stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorBudget {
    pub max_consecutive_errors: u32,
}

impl Default for ErrorBudget {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 10,
        }
    }
}

impl ErrorBudget {
    #[must_use]
    pub fn is_exhausted(self, consecutive_errors: u32) -> bool {
        consecutive_errors >= self.max_consecutive_errors
    }
}

/// Logs the 1st and every `every`-th repeated failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogThrottle {
    pub every: u32,
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self { every: 5 }
    }
}

impl LogThrottle {
    #[must_use]
    pub fn should_log(self, count: u32) -> bool {
        count == 1 || (self.every > 0 && count % self.every == 0)
    }
}

/// Combined failure handling for a polling runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorPolicy {
    pub budget: ErrorBudget,
    pub throttle: LogThrottle,
}

impl ErrorPolicy {
    /// Account for a failed read of `subject`.
    ///
    /// Always writes a history entry. Emits a throttled `error` event, or the
    /// terminal `error` event followed by [`Effect::Stop`] once the budget is
    /// exhausted.
    pub fn on_poll_failure(
        self,
        state: &mut RunnerState,
        now: Timestamp,
        subject: &str,
        error: &DeviceError,
    ) -> Vec<Effect> {
        let count = state.poll_failed();
        state.record_entry(
            HistoryEntry::new(now, HistoryAction::PollError, format!("{subject}: {error}"))
                .with_metadata("consecutive_errors", count)
                .with_metadata("kind", error.kind()),
        );

        if self.budget.is_exhausted(count) {
            tracing::error!(
                entity_id = subject,
                %error,
                consecutive_errors = count,
                "too many consecutive poll failures, stopping runner"
            );
            state.record(
                now,
                HistoryAction::Fatal,
                format!("stopped after {count} consecutive poll failures"),
            );
            return vec![
                Effect::Event(
                    EventType::Error,
                    format!("stopped after {count} consecutive poll failures, last error: {error}"),
                ),
                Effect::Stop,
            ];
        }

        if self.throttle.should_log(count) {
            tracing::warn!(
                entity_id = subject,
                %error,
                consecutive_errors = count,
                "poll failed"
            );
            vec![Effect::Event(
                EventType::Error,
                format!("failed to read {subject} ({count} in a row): {error}"),
            )]
        } else {
            Vec::new()
        }
    }
}
