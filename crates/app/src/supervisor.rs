//! Runner supervisor: the registry of live runners.
//!
//! At most one runner exists per automation id. Starting an id whose runner
//! already stopped on its own replaces it; stopping removes the runner and
//! waits for its task to finish so the `stopped` event is written before
//! returning.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::Mutex;

use homerunner_domain::automation::{Automation, AutomationKind};
use homerunner_domain::error::{HomeRunnerError, NotFoundError};
use homerunner_domain::event::{EventLogEntry, EventType};
use homerunner_domain::history::HistoryEntry;
use homerunner_domain::id::AutomationId;
use homerunner_domain::time::Timestamp;

use crate::ports::{AutomationRepository, EntityStateClient, EventLog};
use crate::runner::alarm_arm::cooldown_remaining;
use crate::runner::{self, RunnerContext, RunnerHandle};

/// Result of a start request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    /// The automation kind has no runner.
    Unsupported,
    /// The settings could not be turned into a runner.
    Misconfigured(String),
}

impl StartOutcome {
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Started | Self::AlreadyRunning)
    }
}

/// Point-in-time view of one runner, for the debug surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSnapshot {
    pub automation_id: AutomationId,
    pub automation_name: String,
    pub kind: AutomationKind,
    pub is_running: bool,
    pub last_observed_state: Option<String>,
    pub error_count: u32,
    pub consecutive_successes: u64,
    pub last_successful_poll_at: Option<Timestamp>,
    pub last_action_attempt_at: Option<Timestamp>,
    /// Seconds until a pending turn-off comes due.
    pub countdown_remaining_secs: Option<u64>,
    /// Seconds until the next arm attempt is allowed.
    pub cooldown_remaining_secs: Option<u64>,
    /// Whether the clock currently falls inside the runner's daily window.
    pub in_window: Option<bool>,
    pub history: Vec<HistoryEntry>,
}

/// Owns every running automation runner.
pub struct RunnerSupervisor<C, L, R> {
    ctx: RunnerContext<C, L, R>,
    runners: Mutex<HashMap<AutomationId, RunnerHandle>>,
}

impl<C, L, R> RunnerSupervisor<C, L, R>
where
    C: EntityStateClient + Send + Sync + 'static,
    L: EventLog + Send + Sync + 'static,
    R: AutomationRepository + Send + Sync + 'static,
{
    pub fn new(ctx: RunnerContext<C, L, R>) -> Self {
        Self {
            ctx,
            runners: Mutex::new(HashMap::new()),
        }
    }

    /// Start a runner for `automation`.
    #[tracing::instrument(
        skip_all,
        fields(automation_id = %automation.id, kind = %automation.kind)
    )]
    pub async fn start(&self, automation: &Automation) -> StartOutcome {
        let error = {
            let mut runners = self.runners.lock().await;
            if runners.get(&automation.id).is_some_and(RunnerHandle::is_running) {
                return StartOutcome::AlreadyRunning;
            }
            if automation.kind == AutomationKind::Custom {
                tracing::debug!("no runner for this automation kind");
                return StartOutcome::Unsupported;
            }
            match runner::spawn(automation, &self.ctx) {
                Ok(handle) => {
                    if runners.insert(automation.id, handle).is_some() {
                        tracing::debug!("replaced a stopped runner");
                    }
                    return StartOutcome::Started;
                }
                Err(error) => error,
            }
        };

        tracing::error!(%error, "invalid automation settings, runner not started");
        let entry = EventLogEntry::new(
            automation.id,
            EventType::Error,
            format!("cannot start {}: {error}", automation.name),
            self.ctx.clock.now(),
        );
        if let Err(err) = self.ctx.event_log.append(entry).await {
            tracing::warn!(error = %err, "failed to append event");
        }
        StartOutcome::Misconfigured(error.to_string())
    }

    /// Load an automation from storage and start it.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] if no automation has this id, or a storage
    /// error if loading fails.
    pub async fn start_by_id(&self, id: AutomationId) -> Result<StartOutcome, HomeRunnerError> {
        let automation = self
            .ctx
            .automations
            .get_by_id(id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "Automation",
                id: id.to_string(),
            })?;
        Ok(self.start(&automation).await)
    }

    /// Stop and forget the runner of `id`. Returns `false` if there was none.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self, id: AutomationId) -> bool {
        let Some(handle) = self.runners.lock().await.remove(&id) else {
            return false;
        };
        handle.shutdown.send_replace(true);
        if let Err(err) = handle.task.await {
            tracing::error!(error = %err, "runner task ended abnormally");
        }
        true
    }

    /// Start every automation flagged active. Returns how many runners were
    /// started.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the automations cannot be loaded.
    #[tracing::instrument(skip(self))]
    pub async fn start_all_active(&self) -> Result<usize, HomeRunnerError> {
        let automations = self.ctx.automations.get_active().await?;
        let mut started = 0;
        for automation in &automations {
            if self.start(automation).await == StartOutcome::Started {
                started += 1;
            }
        }
        tracing::info!(started, total = automations.len(), "active automations started");
        Ok(started)
    }

    #[tracing::instrument(skip(self))]
    pub async fn stop_all(&self) {
        let ids: Vec<_> = self.runners.lock().await.keys().copied().collect();
        for id in ids {
            self.stop(id).await;
        }
    }

    /// Debug snapshot of one runner, `None` if it is not registered.
    pub async fn get_debug_info(&self, id: AutomationId) -> Option<DebugSnapshot> {
        let runners = self.runners.lock().await;
        runners.get(&id).map(|handle| self.snapshot(id, handle))
    }

    /// Debug snapshots of every registered runner, sorted by name.
    pub async fn list_debug_info(&self) -> Vec<DebugSnapshot> {
        let runners = self.runners.lock().await;
        let mut snapshots: Vec<_> = runners
            .iter()
            .map(|(id, handle)| self.snapshot(*id, handle))
            .collect();
        snapshots.sort_by(|a, b| a.automation_name.cmp(&b.automation_name));
        snapshots
    }

    /// Most recent event log entries of one automation, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the event log cannot be read.
    pub async fn recent_events(
        &self,
        id: AutomationId,
        limit: usize,
    ) -> Result<Vec<EventLogEntry>, HomeRunnerError> {
        self.ctx.event_log.recent_for_automation(id, limit).await
    }

    fn snapshot(&self, id: AutomationId, handle: &RunnerHandle) -> DebugSnapshot {
        let state = handle.state.borrow().clone();
        let now = self.ctx.clock.now();
        let countdown_remaining_secs = state.pending_action.as_ref().map(|pending| {
            (pending.due_at - now)
                .to_std()
                .map_or(0, |left| left.as_secs())
        });
        let cooldown_remaining_secs = handle.derivation.cooldown.map(|cooldown| {
            cooldown_remaining(state.last_action_attempt_at, cooldown, now)
                .map_or(0, |left| left.as_secs())
        });
        let in_window = handle
            .derivation
            .window
            .map(|window| window.contains(self.ctx.clock.local_time()));

        DebugSnapshot {
            automation_id: id,
            automation_name: handle.name.clone(),
            kind: handle.kind,
            is_running: handle.is_running(),
            last_observed_state: state.last_observed_state,
            error_count: state.consecutive_errors,
            consecutive_successes: state.consecutive_successes,
            last_successful_poll_at: state.last_successful_poll_at,
            last_action_attempt_at: state.last_action_attempt_at,
            countdown_remaining_secs,
            cooldown_remaining_secs,
            in_window,
            history: state.history.last(self.ctx.config.debug_history_limit),
        }
    }
}
