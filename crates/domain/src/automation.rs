//! Automation: a user-defined, unattended rule bound to hub entities.
//!
//! The engine treats an [`Automation`] as an immutable snapshot: a runner is
//! built from it once, and any edit requires restarting that runner. The
//! free-form `settings` map is turned into typed settings by
//! [`MotionLightSettings`] and [`AlarmArmSettings`].

mod settings;

pub use settings::{AlarmArmSettings, MotionLightSettings};

use serde::{Deserialize, Serialize};

use crate::error::{HomeRunnerError, ValidationError};
use crate::id::AutomationId;
use crate::time::Timestamp;

/// Free-form settings as stored alongside an automation.
pub type Settings = serde_json::Map<String, serde_json::Value>;

/// Which runner drives an automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationKind {
    /// Motion sensor edge → light on, delayed light off.
    EdgeTriggered,
    /// Time-gated alarm panel auto-arm.
    ScheduledWindow,
    /// Stored but never run by the engine.
    Custom,
}

impl AutomationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EdgeTriggered => "edge_triggered",
            Self::ScheduledWindow => "scheduled_window",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for AutomationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AutomationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edge_triggered" => Ok(Self::EdgeTriggered),
            "scheduled_window" => Ok(Self::ScheduledWindow),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown automation type `{other}`")),
        }
    }
}

/// An automation record as persisted by the configuration layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    pub id: AutomationId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AutomationKind,
    #[serde(default)]
    pub settings: Settings,
    pub is_active: bool,
    #[serde(default)]
    pub trigger_count: u64,
    pub last_triggered: Option<Timestamp>,
}

impl Automation {
    /// Create a builder for constructing an [`Automation`].
    #[must_use]
    pub fn builder() -> AutomationBuilder {
        AutomationBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HomeRunnerError::Validation`] when `name` is empty.
    pub fn validate(&self) -> Result<(), HomeRunnerError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Automation`].
#[derive(Debug, Default)]
pub struct AutomationBuilder {
    id: Option<AutomationId>,
    name: Option<String>,
    kind: Option<AutomationKind>,
    settings: Settings,
    is_active: Option<bool>,
    trigger_count: u64,
    last_triggered: Option<Timestamp>,
}

impl AutomationBuilder {
    #[must_use]
    pub fn id(mut self, id: AutomationId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: AutomationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    #[must_use]
    pub fn trigger_count(mut self, count: u64) -> Self {
        self.trigger_count = count;
        self
    }

    #[must_use]
    pub fn last_triggered(mut self, ts: Timestamp) -> Self {
        self.last_triggered = Some(ts);
        self
    }

    /// Consume the builder, validate, and return an [`Automation`].
    ///
    /// # Errors
    ///
    /// Returns [`HomeRunnerError::Validation`] if the name is missing or empty.
    pub fn build(self) -> Result<Automation, HomeRunnerError> {
        let automation = Automation {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            kind: self.kind.unwrap_or(AutomationKind::Custom),
            settings: self.settings,
            is_active: self.is_active.unwrap_or(true),
            trigger_count: self.trigger_count,
            last_triggered: self.last_triggered,
        };
        automation.validate()?;
        Ok(automation)
    }
}
