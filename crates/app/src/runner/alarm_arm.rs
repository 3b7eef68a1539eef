//! Scheduled-window runner: keep an alarm panel armed overnight.
//!
//! Every poll compares the panel state to the previous one. Inside the daily
//! window a disarmed panel is armed, at most once per cooldown. An arm
//! sequence re-checks the panel, sends the arm request (with one fallback
//! mode on server errors), waits for the panel to settle and verifies.

use std::ops::ControlFlow;
use std::time::Duration;

use chrono::NaiveTime;
use tokio::time::MissedTickBehavior;

use homerunner_domain::automation::AlarmArmSettings;
use homerunner_domain::entity::{AlarmState, ArmOutcome};
use homerunner_domain::error::DeviceError;
use homerunner_domain::event::EventType;
use homerunner_domain::history::{HistoryAction, HistoryEntry};
use homerunner_domain::service::{ArmMode, ServiceCall};
use homerunner_domain::time::Timestamp;

use crate::ports::{AutomationRepository, EntityStateClient, EventLog};

use super::policy::ErrorPolicy;
use super::state::RunnerState;
use super::{Effect, Exit, RunnerIo};

/// Time left before another arm attempt is allowed, `None` when allowed now.
#[must_use]
pub fn cooldown_remaining(
    last_attempt: Option<Timestamp>,
    cooldown: Duration,
    now: Timestamp,
) -> Option<Duration> {
    let at = last_attempt?;
    let elapsed = (now - at).to_std().unwrap_or(Duration::ZERO);
    cooldown.checked_sub(elapsed).filter(|left| !left.is_zero())
}

/// Pure transition logic of the alarm auto-arm automation.
#[derive(Debug, Clone)]
pub struct AlarmArm {
    settings: AlarmArmSettings,
    policy: ErrorPolicy,
    state: RunnerState,
}

impl AlarmArm {
    #[must_use]
    pub fn new(settings: AlarmArmSettings, policy: ErrorPolicy, state: RunnerState) -> Self {
        Self {
            settings,
            policy,
            state,
        }
    }

    #[must_use]
    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    #[must_use]
    pub fn settings(&self) -> &AlarmArmSettings {
        &self.settings
    }

    /// Feed a successful read of the panel, taken at wall-clock `local`.
    pub fn on_poll(&mut self, now: Timestamp, local: NaiveTime, raw: &str) -> Vec<Effect> {
        self.state.poll_succeeded(now);
        let panel = &self.settings.alarm_entity;

        match self.state.last_observed_state.as_deref() {
            None => {
                tracing::debug!(entity_id = %panel, state = raw, "initial alarm state");
                self.state
                    .record(now, HistoryAction::Initialized, format!("{panel} is {raw}"));
                self.state.last_observed_state = Some(raw.to_string());
            }
            Some(previous) if previous != raw => {
                tracing::info!(
                    entity_id = %panel,
                    from = previous,
                    to = raw,
                    "alarm state changed"
                );
                let detail = format!("{previous} -> {raw}");
                self.state.record(now, HistoryAction::StateChange, detail);
                self.state.last_observed_state = Some(raw.to_string());
            }
            Some(_) => {}
        }

        let disarmed = AlarmState::from_raw(raw) == AlarmState::Disarmed;
        if !disarmed || !self.settings.window.contains(local) {
            return Vec::new();
        }

        match self.cooldown_remaining(now) {
            None => vec![Effect::Arm],
            Some(left) => {
                self.state.record_entry(
                    HistoryEntry::new(
                        now,
                        HistoryAction::Cooldown,
                        format!("disarmed inside {}, waiting for cooldown", self.settings.window),
                    )
                    .with_metadata("remaining_seconds", left.as_secs()),
                );
                Vec::new()
            }
        }
    }

    /// Feed a failed read of the panel.
    pub fn on_poll_error(&mut self, now: Timestamp, error: &DeviceError) -> Vec<Effect> {
        self.policy.on_poll_failure(
            &mut self.state,
            now,
            self.settings.alarm_entity.as_str(),
            error,
        )
    }

    #[must_use]
    pub fn cooldown_remaining(&self, now: Timestamp) -> Option<Duration> {
        cooldown_remaining(self.state.last_action_attempt_at, self.settings.cooldown, now)
    }

    /// Start an arm sequence. The cooldown counts from here, whatever the
    /// outcome.
    pub fn begin_arm(&mut self, now: Timestamp) -> Vec<Effect> {
        let panel = &self.settings.alarm_entity;
        let mode = self.settings.arm_mode;
        tracing::info!(entity_id = %panel, service = mode.service(), "arming alarm");
        self.state.last_action_attempt_at = Some(now);
        self.state.record_entry(
            HistoryEntry::new(now, HistoryAction::ArmAttempt, format!("arming {panel}"))
                .with_metadata("service", mode.service()),
        );
        vec![
            Effect::Trigger,
            Effect::Event(
                EventType::Triggered,
                format!("{panel} disarmed inside {}, arming", self.settings.window),
            ),
        ]
    }

    /// Fresh read taken right before the arm request. Returns whether to
    /// proceed.
    pub fn on_precheck(&mut self, now: Timestamp, reading: Result<&str, &DeviceError>) -> bool {
        let panel = &self.settings.alarm_entity;
        let detail = match reading {
            Ok(raw) if AlarmState::from_raw(raw) == AlarmState::Disarmed => return true,
            Ok(raw) => format!("{panel} is already {raw}"),
            Err(error) => format!("could not re-check {panel}: {error}"),
        };
        tracing::info!(entity_id = %panel, "{detail}, arm aborted");
        self.state.record(now, HistoryAction::ArmAborted, detail);
        false
    }

    /// The arm request in `mode` was rejected. Returns the mode to retry with.
    pub fn on_arm_rejected(
        &mut self,
        now: Timestamp,
        mode: ArmMode,
        error: &DeviceError,
    ) -> Option<ArmMode> {
        let next = self.settings.fallback.next_mode(mode, error)?;
        tracing::warn!(
            entity_id = %self.settings.alarm_entity,
            %error,
            rejected = mode.service(),
            retry = next.service(),
            "arm request rejected, falling back"
        );
        self.state.record_entry(
            HistoryEntry::new(
                now,
                HistoryAction::ArmFallback,
                format!("{} rejected: {error}", mode.service()),
            )
            .with_metadata("retry", next.service()),
        );
        Some(next)
    }

    /// Every arm request failed.
    pub fn on_arm_failed(&mut self, now: Timestamp, error: &DeviceError) -> Vec<Effect> {
        let panel = &self.settings.alarm_entity;
        tracing::error!(entity_id = %panel, %error, "failed to arm alarm");
        self.state
            .record(now, HistoryAction::ArmFailed, format!("{panel}: {error}"));
        vec![Effect::Event(
            EventType::Error,
            format!("failed to arm {panel}: {error}"),
        )]
    }

    /// Read taken after the settle delay; `mode` is the one that was accepted.
    pub fn on_verify(
        &mut self,
        now: Timestamp,
        mode: ArmMode,
        reading: Result<&str, &DeviceError>,
    ) -> Vec<Effect> {
        let panel = &self.settings.alarm_entity;
        let raw = match reading {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(entity_id = %panel, %error, "could not verify arm");
                self.state.record(
                    now,
                    HistoryAction::VerifyFailed,
                    format!("could not read {panel}: {error}"),
                );
                return vec![Effect::Event(
                    EventType::Error,
                    format!("could not verify arm of {panel}: {error}"),
                )];
            }
        };

        let outcome = AlarmState::from_raw(raw).arm_outcome();
        let action = match outcome {
            ArmOutcome::Armed => HistoryAction::ArmVerified,
            ArmOutcome::Pending => HistoryAction::ArmPending,
            ArmOutcome::StillDisarmed | ArmOutcome::Unexpected => HistoryAction::VerifyFailed,
        };
        self.state.record_entry(
            HistoryEntry::new(now, action, format!("{panel} reports {raw}"))
                .with_metadata("service", mode.service()),
        );

        if outcome.is_success() {
            tracing::info!(entity_id = %panel, state = raw, "alarm armed");
            vec![Effect::Event(
                EventType::ActionExecuted,
                format!("{} on {panel}, panel reports {raw}", mode.service()),
            )]
        } else {
            tracing::warn!(entity_id = %panel, state = raw, "arm not confirmed");
            vec![Effect::Event(
                EventType::Error,
                format!("arm of {panel} not confirmed, panel reports {raw}"),
            )]
        }
    }
}

/// Async driver of an [`AlarmArm`] machine.
pub(crate) struct AlarmArmRunner<C, L, R> {
    machine: AlarmArm,
    io: RunnerIo<C, L, R>,
}

impl<C, L, R> AlarmArmRunner<C, L, R>
where
    C: EntityStateClient + Send + Sync + 'static,
    L: EventLog + Send + Sync + 'static,
    R: AutomationRepository + Send + Sync + 'static,
{
    pub(crate) fn new(
        settings: AlarmArmSettings,
        state: RunnerState,
        io: RunnerIo<C, L, R>,
    ) -> Self {
        let policy = io.config().error_policy;
        Self {
            machine: AlarmArm::new(settings, policy, state),
            io,
        }
    }

    pub(crate) async fn run(mut self) {
        let description = format!(
            "keeping {} armed during {}",
            self.machine.settings.alarm_entity, self.machine.settings.window
        );
        self.io.started(&mut self.machine.state, description).await;

        let mut ticker = tokio::time::interval(self.io.config().alarm_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            let stop = tokio::select! {
                biased;
                () = self.io.stop_requested() => true,
                _ = ticker.tick() => false,
            };
            if stop {
                break Exit::Stopped;
            }

            let reading = self
                .io
                .client()
                .get_state(&self.machine.settings.alarm_entity)
                .await;
            if !self.io.alive() {
                break Exit::Stopped;
            }
            let now = self.io.clock().now();
            let effects = match reading {
                Ok(snapshot) => {
                    let local = self.io.clock().local_time();
                    self.machine.on_poll(now, local, &snapshot.state)
                }
                Err(err) => self.machine.on_poll_error(now, &err),
            };

            let flow = self.apply(effects).await;
            self.io.publish(&self.machine.state);
            if let ControlFlow::Break(exit) = flow {
                break exit;
            }
        };

        self.io.finished(&mut self.machine.state, exit).await;
    }

    async fn apply(&mut self, effects: Vec<Effect>) -> ControlFlow<Exit> {
        for effect in effects {
            match effect {
                Effect::Arm => self.arm().await?,
                other => self.emit(vec![other]).await?,
            }
        }
        ControlFlow::Continue(())
    }

    /// Apply effects produced inside the arm sequence.
    async fn emit(&self, effects: Vec<Effect>) -> ControlFlow<Exit> {
        for effect in effects {
            if let Some(other) = self.io.apply_common(effect).await? {
                tracing::debug!(effect = ?other, "effect not handled by alarm runner");
            }
        }
        ControlFlow::Continue(())
    }

    async fn arm(&mut self) -> ControlFlow<Exit> {
        let panel = self.machine.settings.alarm_entity.clone();

        let effects = self.machine.begin_arm(self.io.clock().now());
        self.emit(effects).await?;
        self.io.publish(&self.machine.state);

        let reading = self.io.client().get_state(&panel).await;
        if !self.io.alive() {
            return ControlFlow::Break(Exit::Stopped);
        }
        let now = self.io.clock().now();
        if !self
            .machine
            .on_precheck(now, reading.as_ref().map(|s| s.state.as_str()))
        {
            return ControlFlow::Continue(());
        }

        let mut mode = self.machine.settings.arm_mode;
        let mut result = self.send_arm(mode).await?;
        if let Err(error) = &result {
            let now = self.io.clock().now();
            if let Some(next) = self.machine.on_arm_rejected(now, mode, error) {
                mode = next;
                result = self.send_arm(mode).await?;
            }
        }
        if let Err(error) = result {
            let effects = self.machine.on_arm_failed(self.io.clock().now(), &error);
            return self.emit(effects).await;
        }
        self.io.publish(&self.machine.state);

        let settled = tokio::select! {
            biased;
            () = self.io.stop_requested() => false,
            () = tokio::time::sleep(self.io.config().arm_settle_delay) => true,
        };
        if !settled {
            return ControlFlow::Break(Exit::Stopped);
        }

        let reading = self.io.client().get_state(&panel).await;
        if !self.io.alive() {
            return ControlFlow::Break(Exit::Stopped);
        }
        let now = self.io.clock().now();
        let effects = self
            .machine
            .on_verify(now, mode, reading.as_ref().map(|s| s.state.as_str()));
        self.emit(effects).await
    }

    async fn send_arm(&self, mode: ArmMode) -> ControlFlow<Exit, Result<(), DeviceError>> {
        let settings = &self.machine.settings;
        let call = ServiceCall::alarm_arm(
            settings.alarm_entity.clone(),
            mode,
            settings.code.as_deref(),
        );
        let result = self.io.client().invoke_action(&call).await;
        if self.io.alive() {
            ControlFlow::Continue(result)
        } else {
            ControlFlow::Break(Exit::Stopped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use homerunner_domain::automation::{Automation, AutomationKind};
    use homerunner_domain::entity::EntityRef;
    use homerunner_domain::service::ArmFallback;
    use homerunner_domain::time::DailyWindow;

    use crate::runner::RunnerContext;
    use crate::supervisor::RunnerSupervisor;
    use crate::test_support::{ManualClock, SpyAutomationRepo, SpyEventLog, StubClient};

    const PANEL: &str = "alarm_control_panel.house";

    fn settings() -> AlarmArmSettings {
        AlarmArmSettings {
            alarm_entity: EntityRef::parse(PANEL).unwrap(),
            window: DailyWindow::default(),
            cooldown: Duration::from_secs(300),
            arm_mode: ArmMode::Away,
            fallback: ArmFallback::ArmHomeOnServerError,
            code: None,
        }
    }

    fn machine() -> AlarmArm {
        AlarmArm::new(settings(), ErrorPolicy::default(), RunnerState::new(100))
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn ts() -> Timestamp {
        homerunner_domain::time::now()
    }

    fn actions(machine: &AlarmArm) -> Vec<HistoryAction> {
        machine.state().history.iter().map(|e| e.action).collect()
    }

    #[test]
    fn should_request_arm_when_disarmed_inside_window() {
        let mut m = machine();
        assert_eq!(m.on_poll(ts(), at(21, 5), "disarmed"), [Effect::Arm]);
    }

    #[test]
    fn should_ignore_disarmed_panel_outside_window() {
        let mut m = machine();
        assert!(m.on_poll(ts(), at(12, 0), "disarmed").is_empty());
        assert!(m.on_poll(ts(), at(7, 0), "disarmed").is_empty());
    }

    #[test]
    fn should_ignore_armed_panel_inside_window() {
        let mut m = machine();
        assert!(m.on_poll(ts(), at(23, 0), "armed_home").is_empty());
    }

    #[test]
    fn should_record_state_change_without_acting() {
        let mut m = machine();
        m.on_poll(ts(), at(12, 0), "disarmed");
        assert!(m.on_poll(ts(), at(12, 1), "armed_away").is_empty());
        let last = m.state().history.latest().unwrap();
        assert_eq!(last.action, HistoryAction::StateChange);
        assert_eq!(last.detail, "disarmed -> armed_away");
        assert_eq!(m.state().last_observed_state.as_deref(), Some("armed_away"));
    }

    #[test]
    fn should_suppress_arm_during_cooldown() {
        let mut m = machine();
        let start = ts();
        m.begin_arm(start);
        let later = start + chrono::TimeDelta::seconds(60);
        assert!(m.on_poll(later, at(21, 6), "disarmed").is_empty());
        let last = m.state().history.latest().unwrap();
        assert_eq!(last.action, HistoryAction::Cooldown);
        assert_eq!(last.metadata.as_ref().unwrap()["remaining_seconds"], 240);

        let expired = start + chrono::TimeDelta::seconds(300);
        assert_eq!(m.on_poll(expired, at(21, 10), "disarmed"), [Effect::Arm]);
    }

    #[test]
    fn should_compute_cooldown_remaining() {
        let now = ts();
        let cooldown = Duration::from_secs(300);
        assert_eq!(cooldown_remaining(None, cooldown, now), None);
        assert_eq!(
            cooldown_remaining(Some(now - chrono::TimeDelta::seconds(100)), cooldown, now),
            Some(Duration::from_secs(200))
        );
        assert_eq!(
            cooldown_remaining(Some(now - chrono::TimeDelta::seconds(400)), cooldown, now),
            None
        );
    }

    #[test]
    fn should_abort_when_precheck_sees_armed_panel() {
        let mut m = machine();
        m.begin_arm(ts());
        assert!(!m.on_precheck(ts(), Ok("armed_night")));
        assert!(!m.on_precheck(ts(), Err(&DeviceError::Timeout)));
        assert!(m.on_precheck(ts(), Ok("disarmed")));
        assert_eq!(m.state().consecutive_errors, 0);
        let aborted = actions(&m)
            .into_iter()
            .filter(|a| *a == HistoryAction::ArmAborted)
            .count();
        assert_eq!(aborted, 2);
    }

    #[test]
    fn should_fall_back_to_home_only_on_server_error() {
        let mut m = machine();
        let server = DeviceError::ServiceRejected {
            status: 500,
            body: "boom".into(),
        };
        let client = DeviceError::ServiceRejected {
            status: 400,
            body: "bad code".into(),
        };
        assert_eq!(m.on_arm_rejected(ts(), ArmMode::Away, &server), Some(ArmMode::Home));
        assert_eq!(m.on_arm_rejected(ts(), ArmMode::Away, &client), None);
        assert_eq!(m.on_arm_rejected(ts(), ArmMode::Home, &server), None);
        assert!(actions(&m).contains(&HistoryAction::ArmFallback));
    }

    #[test]
    fn should_classify_verification() {
        let mut m = machine();
        let armed = m.on_verify(ts(), ArmMode::Away, Ok("armed_away"));
        assert!(matches!(&armed[..], [Effect::Event(EventType::ActionExecuted, _)]));
        let pending = m.on_verify(ts(), ArmMode::Away, Ok("arming"));
        assert!(matches!(&pending[..], [Effect::Event(EventType::ActionExecuted, _)]));
        let ignored = m.on_verify(ts(), ArmMode::Away, Ok("disarmed"));
        assert!(matches!(&ignored[..], [Effect::Event(EventType::Error, _)]));
        let failed = m.on_verify(ts(), ArmMode::Away, Err(&DeviceError::Timeout));
        assert!(matches!(&failed[..], [Effect::Event(EventType::Error, _)]));
        assert_eq!(
            actions(&m),
            [
                HistoryAction::ArmVerified,
                HistoryAction::ArmPending,
                HistoryAction::VerifyFailed,
                HistoryAction::VerifyFailed,
            ]
        );
    }

    #[test]
    fn should_not_touch_observed_state_while_verifying() {
        let mut m = machine();
        m.on_poll(ts(), at(21, 5), "disarmed");
        m.on_verify(ts(), ArmMode::Away, Ok("armed_away"));
        assert_eq!(m.state().last_observed_state.as_deref(), Some("disarmed"));
    }

    // ── Task-level tests (paused tokio time) ───────────────────────

    fn automation() -> Automation {
        Automation::builder()
            .name("Night arm")
            .kind(AutomationKind::ScheduledWindow)
            .setting("alarm_entity", PANEL)
            .setting("window_start", "21:00")
            .setting("window_end", "07:00")
            .setting("cooldown_seconds", 300)
            .build()
            .unwrap()
    }

    struct Fixture {
        client: Arc<StubClient>,
        log: Arc<SpyEventLog>,
        clock: Arc<ManualClock>,
        supervisor: RunnerSupervisor<StubClient, SpyEventLog, SpyAutomationRepo>,
    }

    fn fixture(hour: u32, minute: u32) -> Fixture {
        let client = Arc::new(StubClient::default());
        let log = Arc::new(SpyEventLog::default());
        let clock = Arc::new(ManualClock::at(hour, minute));
        let ctx = RunnerContext::new(
            Arc::clone(&client),
            Arc::clone(&log),
            Arc::new(SpyAutomationRepo::default()),
            Arc::clone(&clock) as Arc<dyn crate::ports::Clock>,
        );
        Fixture {
            client,
            log,
            clock,
            supervisor: RunnerSupervisor::new(ctx),
        }
    }

    const ARM_AWAY: &str = "alarm_control_panel.alarm_arm_away(alarm_control_panel.house)";
    const ARM_HOME: &str = "alarm_control_panel.alarm_arm_home(alarm_control_panel.house)";

    #[tokio::test(start_paused = true)]
    async fn should_arm_once_then_record_state_change() {
        let fx = fixture(21, 5);
        fx.client.set_state(PANEL, "disarmed");
        fx.client
            .on_action("alarm_control_panel.alarm_arm_away", PANEL, "armed_away");
        let auto = automation();

        fx.supervisor.start(&auto).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fx.client.calls(), [ARM_AWAY]);

        fx.clock.set_time(21, 6);
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(fx.client.calls(), [ARM_AWAY]);

        let debug = fx.supervisor.get_debug_info(auto.id).await.unwrap();
        assert_eq!(debug.last_observed_state.as_deref(), Some("armed_away"));
        assert!(debug.in_window.unwrap());
        let change = debug
            .history
            .iter()
            .find(|e| e.action == HistoryAction::StateChange)
            .unwrap();
        assert_eq!(change.detail, "disarmed -> armed_away");
        assert!(debug
            .history
            .iter()
            .any(|e| e.action == HistoryAction::ArmVerified));
        assert!(fx
            .log
            .entries()
            .iter()
            .any(|e| e.event_type == EventType::ActionExecuted));
        fx.supervisor.stop(auto.id).await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_respect_cooldown_when_panel_ignores_arm() {
        let fx = fixture(21, 5);
        fx.client.set_state(PANEL, "disarmed");
        let auto = automation();

        fx.supervisor.start(&auto).await;
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(fx.client.calls(), [ARM_AWAY]);

        let debug = fx.supervisor.get_debug_info(auto.id).await.unwrap();
        assert!(debug
            .history
            .iter()
            .any(|e| e.action == HistoryAction::Cooldown));
        assert_eq!(debug.cooldown_remaining_secs, Some(300));

        fx.clock.advance(Duration::from_secs(301));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fx.client.calls(), [ARM_AWAY, ARM_AWAY]);
        fx.supervisor.stop(auto.id).await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_fall_back_to_arm_home_on_server_error() {
        let fx = fixture(22, 0);
        fx.client.set_state(PANEL, "disarmed");
        fx.client.fail_next_action(DeviceError::ServiceRejected {
            status: 500,
            body: "internal".into(),
        });
        fx.client
            .on_action("alarm_control_panel.alarm_arm_home", PANEL, "armed_home");
        let auto = automation();

        fx.supervisor.start(&auto).await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(fx.client.calls(), [ARM_AWAY, ARM_HOME]);
        let debug = fx.supervisor.get_debug_info(auto.id).await.unwrap();
        let tags: Vec<_> = debug.history.iter().map(|e| e.action).collect();
        assert!(tags.contains(&HistoryAction::ArmFallback));
        assert!(tags.contains(&HistoryAction::ArmVerified));
        fx.supervisor.stop(auto.id).await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_promptly_during_settle_delay() {
        let fx = fixture(23, 0);
        fx.client.set_state(PANEL, "disarmed");
        let auto = automation();

        fx.supervisor.start(&auto).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(fx.supervisor.stop(auto.id).await);
        let reads = fx.client.state_reads();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fx.client.state_reads(), reads);
        assert!(fx
            .log
            .entries()
            .iter()
            .any(|e| e.event_type == EventType::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_after_ten_consecutive_failures() {
        let fx = fixture(22, 0);
        fx.client.fail_state(PANEL, DeviceError::Timeout);
        let auto = automation();

        fx.supervisor.start(&auto).await;
        tokio::time::sleep(Duration::from_secs(400)).await;

        assert_eq!(fx.client.state_reads(), 10);
        assert!(fx.client.calls().is_empty());
        let debug = fx.supervisor.get_debug_info(auto.id).await.unwrap();
        assert!(!debug.is_running);
        assert_eq!(debug.error_count, 10);

        let entries = fx.log.entries();
        let terminal = entries
            .iter()
            .filter(|e| e.event_type == EventType::Error && e.message.starts_with("stopped after"))
            .count();
        assert_eq!(terminal, 1);
        let last = entries.last().unwrap();
        assert_eq!(last.event_type, EventType::Stopped);
        assert_eq!(last.message, "runner stopped after a fatal error");
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_send_arm_when_stopped_during_precheck() {
        let fx = fixture(22, 0);
        fx.client.set_state(PANEL, "disarmed");
        fx.client.set_latency(Duration::from_secs(5));
        let auto = automation();

        // first poll answers at 5s, the precheck read is then in flight
        fx.supervisor.start(&auto).await;
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(fx.supervisor.stop(auto.id).await);

        assert!(fx.client.calls().is_empty());
        assert_eq!(fx.client.state_reads(), 2);
        let last = fx.log.entries().pop().unwrap();
        assert_eq!(last.event_type, EventType::Stopped);
        assert_eq!(last.message, "runner stopped");
    }

    #[tokio::test(start_paused = true)]
    async fn should_discard_arm_result_that_lands_after_stop() {
        let fx = fixture(22, 0);
        fx.client.set_state(PANEL, "disarmed");
        fx.client.set_latency(Duration::from_secs(5));
        let auto = automation();

        // poll and precheck take 10s, the arm call then answers at 15s
        fx.supervisor.start(&auto).await;
        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(fx.client.calls(), [ARM_AWAY]);
        assert!(fx.supervisor.stop(auto.id).await);

        assert_eq!(fx.client.calls(), [ARM_AWAY]);
        assert_eq!(fx.client.state_reads(), 2);
        let entries = fx.log.entries();
        assert!(!entries
            .iter()
            .any(|e| e.event_type == EventType::ActionExecuted));
        let last = entries.last().unwrap();
        assert_eq!(last.event_type, EventType::Stopped);
        assert_eq!(last.message, "runner stopped");
    }
}
