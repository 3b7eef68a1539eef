//! Entity: an addressable device or sensor exposed by the hub.
//!
//! The engine never owns entities; it only reads [`EntitySnapshot`]s and
//! targets entities by their [`EntityRef`] when calling services.

mod state;

pub use state::{AlarmState, ArmOutcome, BinaryState};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::Timestamp;

/// Domain-qualified entity identifier, e.g. `binary_sensor.hall_motion`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityRef(String);

impl EntityRef {
    /// Validate and wrap an entity id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEntityId`] unless the id is made of a
    /// non-empty domain and a non-empty object id separated by a single dot.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let valid = match value.split_once('.') {
            Some((domain, object_id)) => {
                !domain.is_empty()
                    && !object_id.is_empty()
                    && !object_id.contains('.')
                    && !value.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if valid {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidEntityId(value))
        }
    }

    /// The domain part (`light`, `binary_sensor`, `alarm_control_panel`, …).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('.').map_or("", |(domain, _)| domain)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntityRef {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EntityRef> for String {
    fn from(value: EntityRef) -> Self {
        value.0
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time reading of an entity as reported by the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub entity_id: EntityRef,
    pub state: String,
    pub last_changed: Option<Timestamp>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl EntitySnapshot {
    /// Snapshot with no attributes and unknown change time.
    #[must_use]
    pub fn new(entity_id: EntityRef, state: impl Into<String>) -> Self {
        Self {
            entity_id,
            state: state.into(),
            last_changed: None,
            attributes: serde_json::Map::new(),
        }
    }
}
