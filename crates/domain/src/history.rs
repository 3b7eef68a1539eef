//! Runner history: a bounded diagnostic trail kept per runner.
//!
//! Entries are cheap and written on every notable step (including errors that
//! are not logged), so the ring is capacity-bounded and evicts oldest first.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Default number of entries retained per runner.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// What a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Started,
    Stopped,
    Initialized,
    PollError,
    UnexpectedState,
    Fatal,
    // edge-triggered
    MotionDetected,
    LightTurnedOn,
    LightTurnOnFailed,
    CountdownStarted,
    CountdownCancelled,
    CountdownAborted,
    LightTurnedOff,
    LightTurnOffFailed,
    // scheduled-window
    StateChange,
    Cooldown,
    ArmAttempt,
    ArmAborted,
    ArmFallback,
    ArmFailed,
    ArmVerified,
    ArmPending,
    VerifyFailed,
}

impl HistoryAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Initialized => "initialized",
            Self::PollError => "poll_error",
            Self::UnexpectedState => "unexpected_state",
            Self::Fatal => "fatal",
            Self::MotionDetected => "motion_detected",
            Self::LightTurnedOn => "light_turned_on",
            Self::LightTurnOnFailed => "light_turn_on_failed",
            Self::CountdownStarted => "countdown_started",
            Self::CountdownCancelled => "countdown_cancelled",
            Self::CountdownAborted => "countdown_aborted",
            Self::LightTurnedOff => "light_turned_off",
            Self::LightTurnOffFailed => "light_turn_off_failed",
            Self::StateChange => "state_change",
            Self::Cooldown => "cooldown",
            Self::ArmAttempt => "arm_attempt",
            Self::ArmAborted => "arm_aborted",
            Self::ArmFallback => "arm_fallback",
            Self::ArmFailed => "arm_failed",
            Self::ArmVerified => "arm_verified",
            Self::ArmPending => "arm_pending",
            Self::VerifyFailed => "verify_failed",
        }
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diagnostic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: Timestamp,
    pub action: HistoryAction,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl HistoryEntry {
    #[must_use]
    pub fn new(timestamp: Timestamp, action: HistoryAction, detail: impl Into<String>) -> Self {
        Self {
            timestamp,
            action,
            detail: detail.into(),
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Fixed-capacity, append-only ring of [`HistoryEntry`].
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRing {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryRing {
    /// A capacity of zero is bumped to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Borrowing iterator, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// The `n` most recent entries, oldest first.
    #[must_use]
    pub fn last(&self, n: usize) -> Vec<HistoryEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }
}
