//! Event log entries: the durable, append-only trail written by runners.

use serde::{Deserialize, Serialize};

use crate::id::{AutomationId, EventId};
use crate::time::Timestamp;

/// Kind of event log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Started,
    Stopped,
    Triggered,
    ActionExecuted,
    Error,
}

impl EventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Triggered => "triggered",
            Self::ActionExecuted => "action_executed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "stopped" => Ok(Self::Stopped),
            "triggered" => Ok(Self::Triggered),
            "action_executed" => Ok(Self::ActionExecuted),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown event type `{other}`")),
        }
    }
}

/// A single event log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: EventId,
    pub automation_id: AutomationId,
    pub event_type: EventType,
    pub message: String,
    pub created_at: Timestamp,
}

impl EventLogEntry {
    /// Create a new entry with a fresh id, stamped at `created_at`.
    #[must_use]
    pub fn new(
        automation_id: AutomationId,
        event_type: EventType,
        message: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: EventId::new(),
            automation_id,
            event_type,
            message: message.into(),
            created_at,
        }
    }
}
