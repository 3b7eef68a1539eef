//! Edge-triggered runner: motion sensor → light.
//!
//! `off → on` turns the light on immediately. `on → off` schedules a delayed
//! turn-off; when it comes due the sensor is read again and the light is only
//! turned off if motion is still clear. Repeated identical readings do nothing.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use homerunner_domain::automation::MotionLightSettings;
use homerunner_domain::entity::BinaryState;
use homerunner_domain::error::DeviceError;
use homerunner_domain::event::EventType;
use homerunner_domain::history::{HistoryAction, HistoryEntry};
use homerunner_domain::service::ServiceCall;
use homerunner_domain::time::Timestamp;

use crate::ports::{AutomationRepository, EntityStateClient, EventLog};

use super::policy::ErrorPolicy;
use super::state::{PendingAction, RunnerState};
use super::{Effect, Exit, RunnerIo};

/// Pure transition logic of the motion → light automation.
#[derive(Debug, Clone)]
pub struct MotionLight {
    settings: MotionLightSettings,
    policy: ErrorPolicy,
    state: RunnerState,
    /// Last non-binary reading, so it is only recorded once.
    last_unexpected: Option<String>,
}

impl MotionLight {
    #[must_use]
    pub fn new(settings: MotionLightSettings, policy: ErrorPolicy, state: RunnerState) -> Self {
        Self {
            settings,
            policy,
            state,
            last_unexpected: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    #[must_use]
    pub fn settings(&self) -> &MotionLightSettings {
        &self.settings
    }

    /// Feed a successful read of the motion sensor.
    pub fn on_poll(&mut self, now: Timestamp, raw: &str) -> Vec<Effect> {
        self.state.poll_succeeded(now);
        let Some(observed) = self.interpret(now, raw) else {
            return Vec::new();
        };

        let previous = self
            .state
            .last_observed_state
            .as_deref()
            .and_then(BinaryState::from_raw);
        self.state.last_observed_state = Some(observed.to_string());

        match (previous, observed) {
            (None, _) => {
                tracing::debug!(
                    entity_id = %self.settings.motion_entity,
                    state = %observed,
                    "initial motion state"
                );
                self.state.record(
                    now,
                    HistoryAction::Initialized,
                    format!("{} is {observed}", self.settings.motion_entity),
                );
                Vec::new()
            }
            (Some(BinaryState::Off), BinaryState::On) => self.motion_detected(now),
            (Some(BinaryState::On), BinaryState::Off) => self.motion_cleared(now),
            _ => Vec::new(),
        }
    }

    /// Feed a failed read of the motion sensor.
    pub fn on_poll_error(&mut self, now: Timestamp, error: &DeviceError) -> Vec<Effect> {
        self.policy.on_poll_failure(
            &mut self.state,
            now,
            self.settings.motion_entity.as_str(),
            error,
        )
    }

    /// The deferred turn-off came due; `reading` is a fresh read of the sensor.
    pub fn on_countdown_due(
        &mut self,
        now: Timestamp,
        reading: Result<&str, &DeviceError>,
    ) -> Vec<Effect> {
        if self.state.pending_action.is_none() {
            return Vec::new();
        }
        let raw = match reading {
            Ok(raw) => raw,
            Err(error) => {
                self.state.record(
                    now,
                    HistoryAction::VerifyFailed,
                    format!("could not re-check {}: {error}", self.settings.motion_entity),
                );
                let mut effects = self.on_poll_error(now, error);
                if !effects.contains(&Effect::Stop) {
                    effects.push(self.reschedule(now));
                }
                return effects;
            }
        };

        self.state.poll_succeeded(now);
        match self.interpret(now, raw) {
            Some(BinaryState::Off) => {
                self.state.pending_action = None;
                vec![Effect::TurnOffLight]
            }
            Some(BinaryState::On) => {
                self.state.pending_action = None;
                self.state.last_observed_state = Some(BinaryState::On.to_string());
                tracing::info!(
                    entity_id = %self.settings.motion_entity,
                    "motion returned before turn-off, keeping light on"
                );
                self.state.record(
                    now,
                    HistoryAction::CountdownAborted,
                    format!("motion returned on {}", self.settings.motion_entity),
                );
                Vec::new()
            }
            None => vec![self.reschedule(now)],
        }
    }

    /// Outcome of the `turn_on` service call.
    pub fn on_turn_on_result(
        &mut self,
        now: Timestamp,
        result: Result<(), &DeviceError>,
    ) -> Vec<Effect> {
        let light = &self.settings.light_entity;
        match result {
            Ok(()) => {
                tracing::info!(entity_id = %light, "light turned on");
                self.state.record(now, HistoryAction::LightTurnedOn, light.to_string());
                vec![Effect::Event(
                    EventType::ActionExecuted,
                    format!("turned on {light}"),
                )]
            }
            Err(error) => {
                tracing::warn!(entity_id = %light, %error, "failed to turn light on");
                self.state.record(
                    now,
                    HistoryAction::LightTurnOnFailed,
                    format!("{light}: {error}"),
                );
                vec![Effect::Event(
                    EventType::Error,
                    format!("failed to turn on {light}: {error}"),
                )]
            }
        }
    }

    /// Outcome of the `turn_off` service call.
    pub fn on_turn_off_result(
        &mut self,
        now: Timestamp,
        result: Result<(), &DeviceError>,
    ) -> Vec<Effect> {
        let light = &self.settings.light_entity;
        match result {
            Ok(()) => {
                tracing::info!(entity_id = %light, "light turned off");
                self.state.record(now, HistoryAction::LightTurnedOff, light.to_string());
                vec![Effect::Event(
                    EventType::ActionExecuted,
                    format!("turned off {light}"),
                )]
            }
            Err(error) => {
                tracing::warn!(entity_id = %light, %error, "failed to turn light off");
                self.state.record(
                    now,
                    HistoryAction::LightTurnOffFailed,
                    format!("{light}: {error}"),
                );
                vec![Effect::Event(
                    EventType::Error,
                    format!("failed to turn off {light}: {error}"),
                )]
            }
        }
    }

    fn interpret(&mut self, now: Timestamp, raw: &str) -> Option<BinaryState> {
        let observed = BinaryState::from_raw(raw);
        if observed.is_some() {
            self.last_unexpected = None;
        } else if self.last_unexpected.as_deref() != Some(raw) {
            tracing::debug!(
                entity_id = %self.settings.motion_entity,
                state = raw,
                "ignoring non-binary motion state"
            );
            self.state.record(
                now,
                HistoryAction::UnexpectedState,
                format!("{} reported {raw:?}", self.settings.motion_entity),
            );
            self.last_unexpected = Some(raw.to_string());
        }
        observed
    }

    fn motion_detected(&mut self, now: Timestamp) -> Vec<Effect> {
        let motion = &self.settings.motion_entity;
        tracing::info!(entity_id = %motion, "motion detected");
        self.state
            .record(now, HistoryAction::MotionDetected, motion.to_string());

        let mut effects = vec![
            Effect::Trigger,
            Effect::Event(EventType::Triggered, format!("motion detected on {motion}")),
        ];
        if let Some(pending) = self.state.pending_action.take() {
            self.state.record(
                now,
                HistoryAction::CountdownCancelled,
                format!("cancelled: {}", pending.description),
            );
            effects.push(Effect::CancelTurnOff);
        }
        effects.push(Effect::TurnOnLight);
        effects
    }

    fn motion_cleared(&mut self, now: Timestamp) -> Vec<Effect> {
        let motion = &self.settings.motion_entity;
        let delay = self.settings.delay;
        let description = format!(
            "turn off {} in {}s",
            self.settings.light_entity,
            delay.as_secs()
        );
        tracing::info!(
            entity_id = %motion,
            delay_secs = delay.as_secs(),
            "motion cleared, countdown started"
        );
        self.state.record_entry(
            HistoryEntry::new(now, HistoryAction::CountdownStarted, description.clone())
                .with_metadata("delay_seconds", delay.as_secs()),
        );
        self.state.pending_action = Some(PendingAction {
            description,
            due_at: deadline(now, delay),
        });
        vec![
            Effect::Trigger,
            Effect::Event(EventType::Triggered, format!("motion cleared on {motion}")),
            Effect::ScheduleTurnOff(delay),
        ]
    }

    /// Push the pending check back by a full delay.
    fn reschedule(&mut self, now: Timestamp) -> Effect {
        let delay = self.settings.delay;
        if let Some(pending) = self.state.pending_action.as_mut() {
            pending.due_at = deadline(now, delay);
        }
        Effect::ScheduleTurnOff(delay)
    }
}

/// `now + delay`, saturating at the latest representable instant.
fn deadline(now: Timestamp, delay: Duration) -> Timestamp {
    chrono::TimeDelta::from_std(delay)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(Timestamp::MAX_UTC)
}

enum Step {
    Stop,
    Poll,
    CountdownDue,
}

/// Async driver of a [`MotionLight`] machine.
pub(crate) struct MotionLightRunner<C, L, R> {
    machine: MotionLight,
    io: RunnerIo<C, L, R>,
    countdown: Option<Instant>,
}

impl<C, L, R> MotionLightRunner<C, L, R>
where
    C: EntityStateClient + Send + Sync + 'static,
    L: EventLog + Send + Sync + 'static,
    R: AutomationRepository + Send + Sync + 'static,
{
    pub(crate) fn new(
        settings: MotionLightSettings,
        state: RunnerState,
        io: RunnerIo<C, L, R>,
    ) -> Self {
        let policy = io.config().error_policy;
        Self {
            machine: MotionLight::new(settings, policy, state),
            io,
            countdown: None,
        }
    }

    pub(crate) async fn run(mut self) {
        let description = format!(
            "watching {} to drive {}",
            self.machine.settings.motion_entity, self.machine.settings.light_entity
        );
        self.io.started(&mut self.machine.state, description).await;

        let mut ticker = tokio::time::interval(self.io.config().motion_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            let due = self.countdown;
            let step = tokio::select! {
                biased;
                () = self.io.stop_requested() => Step::Stop,
                () = tokio::time::sleep_until(due.unwrap_or_else(Instant::now)),
                    if due.is_some() => Step::CountdownDue,
                _ = ticker.tick() => Step::Poll,
            };

            let effects = match step {
                Step::Stop => break Exit::Stopped,
                Step::Poll => {
                    let reading = self
                        .io
                        .client()
                        .get_state(&self.machine.settings.motion_entity)
                        .await;
                    if !self.io.alive() {
                        break Exit::Stopped;
                    }
                    let now = self.io.clock().now();
                    match reading {
                        Ok(snapshot) => self.machine.on_poll(now, &snapshot.state),
                        Err(err) => self.machine.on_poll_error(now, &err),
                    }
                }
                Step::CountdownDue => {
                    self.countdown = None;
                    let reading = self
                        .io
                        .client()
                        .get_state(&self.machine.settings.motion_entity)
                        .await;
                    if !self.io.alive() {
                        break Exit::Stopped;
                    }
                    let now = self.io.clock().now();
                    self.machine
                        .on_countdown_due(now, reading.as_ref().map(|s| s.state.as_str()))
                }
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
        let mut queue = std::collections::VecDeque::from(effects);
        while let Some(effect) = queue.pop_front() {
            let effect = match self.io.apply_common(effect).await {
                ControlFlow::Break(exit) => return ControlFlow::Break(exit),
                ControlFlow::Continue(None) => continue,
                ControlFlow::Continue(Some(effect)) => effect,
            };
            let follow_up = match effect {
                Effect::ScheduleTurnOff(delay) => {
                    self.countdown = Instant::now().checked_add(delay);
                    Vec::new()
                }
                Effect::CancelTurnOff => {
                    self.countdown = None;
                    Vec::new()
                }
                Effect::TurnOnLight => {
                    let light = self.machine.settings.light_entity.clone();
                    let call = ServiceCall::light_turn_on(light);
                    let result = self.io.client().invoke_action(&call).await;
                    if !self.io.alive() {
                        return ControlFlow::Break(Exit::Stopped);
                    }
                    let now = self.io.clock().now();
                    self.machine.on_turn_on_result(now, result.as_ref().copied())
                }
                Effect::TurnOffLight => {
                    let light = self.machine.settings.light_entity.clone();
                    let call = ServiceCall::light_turn_off(light);
                    let result = self.io.client().invoke_action(&call).await;
                    if !self.io.alive() {
                        return ControlFlow::Break(Exit::Stopped);
                    }
                    let now = self.io.clock().now();
                    self.machine.on_turn_off_result(now, result.as_ref().copied())
                }
                other => {
                    tracing::debug!(effect = ?other, "effect not handled by motion runner");
                    Vec::new()
                }
            };
            queue.extend(follow_up);
        }
        ControlFlow::Continue(())
    }
}
