//! Runners: long-lived polling tasks, one per automation.
//!
//! Each runner splits into a pure state machine (fed poll results, returning
//! [`Effect`]s) and an async task that performs the effects. The task is the
//! only owner of the machine, so no locking is involved; observers receive
//! [`RunnerState`] clones published on a `watch` channel after every step.
//!
//! Stopping is cooperative: the shutdown flag is checked between steps and
//! after every awaited hub call, and results arriving after a stop are
//! discarded.

pub mod alarm_arm;
pub mod motion_light;
pub mod policy;
pub mod state;

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use homerunner_domain::automation::{
    AlarmArmSettings, Automation, AutomationKind, MotionLightSettings,
};
use homerunner_domain::error::ConfigurationError;
use homerunner_domain::event::{EventLogEntry, EventType};
use homerunner_domain::history::{DEFAULT_HISTORY_CAPACITY, HistoryAction};
use homerunner_domain::id::AutomationId;
use homerunner_domain::time::DailyWindow;

use crate::ports::{AutomationRepository, Clock, EntityStateClient, EventLog};

use self::alarm_arm::AlarmArmRunner;
use self::motion_light::MotionLightRunner;
use self::policy::ErrorPolicy;
use self::state::RunnerState;

/// Side effect requested by a runner state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append an entry to the event log.
    Event(EventType, String),
    /// Bump the automation's trigger counter.
    Trigger,
    /// Terminal: stop the runner.
    Stop,
    TurnOnLight,
    ScheduleTurnOff(Duration),
    CancelTurnOff,
    TurnOffLight,
    /// Run the arm sequence against the alarm panel.
    Arm,
}

/// Why a runner task left its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exit {
    /// A stop was requested, or the supervisor went away.
    Stopped,
    /// The error budget ran out.
    Fatal,
}

/// Timing and bookkeeping knobs shared by all runners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    pub motion_poll_interval: Duration,
    pub alarm_poll_interval: Duration,
    /// Wait between an arm request and its verification read.
    pub arm_settle_delay: Duration,
    pub history_capacity: usize,
    /// Number of history entries included in debug snapshots.
    pub debug_history_limit: usize,
    pub error_policy: ErrorPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            motion_poll_interval: Duration::from_millis(750),
            alarm_poll_interval: Duration::from_secs(30),
            arm_settle_delay: Duration::from_secs(5),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            debug_history_limit: 50,
            error_policy: ErrorPolicy::default(),
        }
    }
}

/// Collaborators handed to every runner at construction.
///
/// Credentials live inside the client; runners never look them up.
pub struct RunnerContext<C, L, R> {
    pub client: Arc<C>,
    pub event_log: Arc<L>,
    pub automations: Arc<R>,
    pub clock: Arc<dyn Clock>,
    pub config: RunnerConfig,
}

impl<C, L, R> Clone for RunnerContext<C, L, R> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            event_log: Arc::clone(&self.event_log),
            automations: Arc::clone(&self.automations),
            clock: Arc::clone(&self.clock),
            config: self.config,
        }
    }
}

impl<C, L, R> RunnerContext<C, L, R> {
    pub fn new(
        client: Arc<C>,
        event_log: Arc<L>,
        automations: Arc<R>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            event_log,
            automations,
            clock,
            config: RunnerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }
}

/// Static facts about a runner used to derive debug fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Derivation {
    pub cooldown: Option<Duration>,
    pub window: Option<DailyWindow>,
}

/// Supervisor-side handle on a spawned runner.
pub(crate) struct RunnerHandle {
    pub name: String,
    pub kind: AutomationKind,
    pub derivation: Derivation,
    pub shutdown: watch::Sender<bool>,
    pub state: watch::Receiver<RunnerState>,
    pub task: JoinHandle<()>,
}

impl RunnerHandle {
    pub fn is_running(&self) -> bool {
        self.state.borrow().running && !self.task.is_finished()
    }
}

/// Build the runner matching `automation.kind` and spawn its task.
///
/// # Errors
///
/// Returns [`ConfigurationError`] when the kind has no runner or its settings
/// are unusable. Nothing is spawned in that case.
pub(crate) fn spawn<C, L, R>(
    automation: &Automation,
    ctx: &RunnerContext<C, L, R>,
) -> Result<RunnerHandle, ConfigurationError>
where
    C: EntityStateClient + Send + Sync + 'static,
    L: EventLog + Send + Sync + 'static,
    R: AutomationRepository + Send + Sync + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let initial = RunnerState::new(ctx.config.history_capacity);
    let (state_tx, state_rx) = watch::channel(initial.clone());
    let io = RunnerIo {
        automation_id: automation.id,
        ctx: ctx.clone(),
        shutdown: shutdown_rx,
        publisher: state_tx,
    };

    let (task, derivation) = match automation.kind {
        AutomationKind::EdgeTriggered => {
            let settings = MotionLightSettings::from_settings(&automation.settings)?;
            let runner = MotionLightRunner::new(settings, initial, io);
            (tokio::spawn(runner.run()), Derivation::default())
        }
        AutomationKind::ScheduledWindow => {
            let settings = AlarmArmSettings::from_settings(&automation.settings)?;
            let derivation = Derivation {
                cooldown: Some(settings.cooldown),
                window: Some(settings.window),
            };
            let runner = AlarmArmRunner::new(settings, initial, io);
            (tokio::spawn(runner.run()), derivation)
        }
        AutomationKind::Custom => {
            return Err(ConfigurationError::UnsupportedKind(
                automation.kind.to_string(),
            ));
        }
    };

    Ok(RunnerHandle {
        name: automation.name.clone(),
        kind: automation.kind,
        derivation,
        shutdown: shutdown_tx,
        state: state_rx,
        task,
    })
}

/// The I/O half shared by both runner tasks.
pub(crate) struct RunnerIo<C, L, R> {
    automation_id: AutomationId,
    ctx: RunnerContext<C, L, R>,
    shutdown: watch::Receiver<bool>,
    publisher: watch::Sender<RunnerState>,
}

impl<C, L, R> RunnerIo<C, L, R>
where
    C: EntityStateClient + Send + Sync + 'static,
    L: EventLog + Send + Sync + 'static,
    R: AutomationRepository + Send + Sync + 'static,
{
    fn client(&self) -> &C {
        &self.ctx.client
    }

    fn clock(&self) -> &dyn Clock {
        self.ctx.clock.as_ref()
    }

    fn config(&self) -> &RunnerConfig {
        &self.ctx.config
    }

    fn alive(&self) -> bool {
        !*self.shutdown.borrow()
    }

    fn publish(&self, state: &RunnerState) {
        self.publisher.send_replace(state.clone());
    }

    /// Resolves once a stop was requested (or the supervisor went away).
    async fn stop_requested(&self) {
        let mut rx = self.shutdown.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    async fn log_event(&self, event_type: EventType, message: String) {
        let entry = EventLogEntry::new(
            self.automation_id,
            event_type,
            message,
            self.clock().now(),
        );
        if let Err(err) = self.ctx.event_log.append(entry).await {
            tracing::warn!(
                automation_id = %self.automation_id,
                error = %err,
                "failed to append event"
            );
        }
    }

    async fn record_trigger(&self) {
        let now = self.clock().now();
        if let Err(err) = self
            .ctx
            .automations
            .record_trigger(self.automation_id, now)
            .await
        {
            tracing::warn!(
                automation_id = %self.automation_id,
                error = %err,
                "failed to record trigger"
            );
        }
    }

    /// Perform the effects every runner understands. Runner-specific effects
    /// are handed back untouched.
    async fn apply_common(&self, effect: Effect) -> ControlFlow<Exit, Option<Effect>> {
        match effect {
            Effect::Event(event_type, message) => {
                self.log_event(event_type, message).await;
                ControlFlow::Continue(None)
            }
            Effect::Trigger => {
                self.record_trigger().await;
                ControlFlow::Continue(None)
            }
            Effect::Stop => ControlFlow::Break(Exit::Fatal),
            other => ControlFlow::Continue(Some(other)),
        }
    }

    async fn started(&self, state: &mut RunnerState, description: String) {
        tracing::info!(automation_id = %self.automation_id, "{description}");
        state.record(self.clock().now(), HistoryAction::Started, description.clone());
        self.publish(state);
        self.log_event(EventType::Started, description).await;
    }

    async fn finished(&self, state: &mut RunnerState, exit: Exit) {
        state.running = false;
        state.pending_action = None;
        let message = match exit {
            Exit::Fatal => "runner stopped after a fatal error",
            Exit::Stopped => "runner stopped",
        };
        tracing::info!(automation_id = %self.automation_id, "{message}");
        state.record(self.clock().now(), HistoryAction::Stopped, message);
        self.publish(state);
        self.log_event(EventType::Stopped, message.to_string()).await;
    }
}
