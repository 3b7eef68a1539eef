//! In-memory doubles for the ports, shared by the runner and supervisor tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

use homerunner_domain::automation::Automation;
use homerunner_domain::entity::{EntityRef, EntitySnapshot};
use homerunner_domain::error::{DeviceError, HomeRunnerError, NotFoundError};
use homerunner_domain::event::EventLogEntry;
use homerunner_domain::id::AutomationId;
use homerunner_domain::service::ServiceCall;
use homerunner_domain::time::Timestamp;

use crate::ports::{AutomationRepository, Clock, EntityStateClient, EventLog};

#[derive(Clone)]
enum Scripted {
    State(String),
    Fail(DeviceError),
}

/// Hub double: sticky per-entity states, recorded service calls.
///
/// Answers are decided when the call is made and delivered after the
/// configured latency (zero by default).
#[derive(Default)]
pub struct StubClient {
    states: Mutex<HashMap<String, Scripted>>,
    reactions: Mutex<HashMap<(String, String), String>>,
    action_failures: Mutex<VecDeque<DeviceError>>,
    calls: Mutex<Vec<String>>,
    state_reads: AtomicUsize,
    latency: Mutex<Duration>,
}

impl StubClient {
    pub fn set_state(&self, entity_id: &str, state: &str) {
        self.states
            .lock()
            .unwrap()
            .insert(entity_id.to_string(), Scripted::State(state.to_string()));
    }

    /// Every read of `entity_id` fails with `error` until a state is set.
    pub fn fail_state(&self, entity_id: &str, error: DeviceError) {
        self.states
            .lock()
            .unwrap()
            .insert(entity_id.to_string(), Scripted::Fail(error));
    }

    /// When `service` (as `domain.service`) succeeds against `entity_id`, the
    /// entity switches to `new_state`.
    pub fn on_action(&self, service: &str, entity_id: &str, new_state: &str) {
        self.reactions.lock().unwrap().insert(
            (service.to_string(), entity_id.to_string()),
            new_state.to_string(),
        );
    }

    /// The next service call fails with `error`.
    pub fn fail_next_action(&self, error: DeviceError) {
        self.action_failures.lock().unwrap().push_back(error);
    }

    /// Service calls received so far, rendered as `domain.service(entity)`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn state_reads(&self) -> usize {
        self.state_reads.load(Ordering::SeqCst)
    }

    /// Every later call takes `latency` to answer.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    fn respond<T: Send>(&self, result: T) -> impl Future<Output = T> + Send + use<T> {
        let latency = *self.latency.lock().unwrap();
        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            result
        }
    }
}

impl EntityStateClient for StubClient {
    fn get_state(
        &self,
        entity_id: &EntityRef,
    ) -> impl Future<Output = Result<EntitySnapshot, DeviceError>> + Send {
        self.state_reads.fetch_add(1, Ordering::SeqCst);
        let scripted = self.states.lock().unwrap().get(entity_id.as_str()).cloned();
        let result = match scripted {
            Some(Scripted::State(state)) => Ok(EntitySnapshot::new(entity_id.clone(), state)),
            Some(Scripted::Fail(error)) => Err(error),
            None => Err(DeviceError::NotFound(entity_id.to_string())),
        };
        self.respond(result)
    }

    fn invoke_action(
        &self,
        call: &ServiceCall,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send {
        self.calls.lock().unwrap().push(call.to_string());
        let result = match self.action_failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => {
                let key = (
                    format!("{}.{}", call.domain, call.service),
                    call.entity_id.to_string(),
                );
                if let Some(state) = self.reactions.lock().unwrap().get(&key) {
                    self.set_state(&key.1, state);
                }
                Ok(())
            }
        };
        self.respond(result)
    }
}

/// Event log double that keeps every appended entry.
#[derive(Default)]
pub struct SpyEventLog {
    entries: Mutex<Vec<EventLogEntry>>,
}

impl SpyEventLog {
    pub fn entries(&self) -> Vec<EventLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl EventLog for SpyEventLog {
    fn append(
        &self,
        entry: EventLogEntry,
    ) -> impl Future<Output = Result<EventLogEntry, HomeRunnerError>> + Send {
        self.entries.lock().unwrap().push(entry.clone());
        async move { Ok(entry) }
    }

    fn recent_for_automation(
        &self,
        automation_id: AutomationId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<EventLogEntry>, HomeRunnerError>> + Send {
        let entries: Vec<_> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|e| e.automation_id == automation_id)
            .take(limit)
            .cloned()
            .collect();
        async move { Ok(entries) }
    }
}

/// Automation repository double backed by a map.
#[derive(Default)]
pub struct SpyAutomationRepo {
    automations: Mutex<HashMap<AutomationId, Automation>>,
    triggers: Mutex<HashMap<AutomationId, u64>>,
}

impl SpyAutomationRepo {
    pub fn with(automations: impl IntoIterator<Item = Automation>) -> Self {
        let repo = Self::default();
        repo.automations
            .lock()
            .unwrap()
            .extend(automations.into_iter().map(|a| (a.id, a)));
        repo
    }

    pub fn trigger_count(&self, id: AutomationId) -> u64 {
        self.triggers.lock().unwrap().get(&id).copied().unwrap_or(0)
    }
}

impl AutomationRepository for SpyAutomationRepo {
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HomeRunnerError>> + Send {
        self.automations
            .lock()
            .unwrap()
            .insert(automation.id, automation.clone());
        async move { Ok(automation) }
    }

    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, HomeRunnerError>> + Send {
        let found = self.automations.lock().unwrap().get(&id).cloned();
        async move { Ok(found) }
    }

    fn get_active(&self) -> impl Future<Output = Result<Vec<Automation>, HomeRunnerError>> + Send {
        let mut active: Vec<_> = self
            .automations
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        async move { Ok(active) }
    }

    fn record_trigger(
        &self,
        id: AutomationId,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), HomeRunnerError>> + Send {
        let result = match self.automations.lock().unwrap().get_mut(&id) {
            Some(automation) => {
                automation.trigger_count += 1;
                automation.last_triggered = Some(at);
                Ok(())
            }
            None => Err(NotFoundError {
                entity: "Automation",
                id: id.to_string(),
            }
            .into()),
        };
        *self.triggers.lock().unwrap().entry(id).or_default() += 1;
        async move { result }
    }
}

/// Clock frozen at a chosen instant; `local_time` is the UTC time of day.
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn at(hour: u32, minute: u32) -> Self {
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap();
        Self {
            now: Mutex::new(Utc.from_utc_datetime(&date.and_time(time))),
        }
    }

    /// Jump to `hour:minute` on the same day.
    pub fn set_time(&self, hour: u32, minute: u32) {
        let mut now = self.now.lock().unwrap();
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap();
        *now = Utc.from_utc_datetime(&now.date_naive().and_time(time));
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::TimeDelta::from_std(by).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }

    fn local_time(&self) -> NaiveTime {
        self.now().time()
    }
}
