//! Interpreted entity states: what the runners actually branch on.

use serde::{Deserialize, Serialize};

/// Reading of an on/off entity such as a motion sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryState {
    On,
    Off,
}

impl BinaryState {
    /// Interpret a raw hub state. Anything but `on`/`off` yields `None`.
    #[must_use]
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl std::fmt::Display for BinaryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of an alarm control panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmState {
    Disarmed,
    ArmedAway,
    ArmedHome,
    ArmedNight,
    ArmedVacation,
    ArmedCustomBypass,
    Arming,
    Pending,
    Triggered,
    Unavailable,
    Unknown,
    Other(String),
}

impl AlarmState {
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "disarmed" => Self::Disarmed,
            "armed_away" => Self::ArmedAway,
            "armed_home" => Self::ArmedHome,
            "armed_night" => Self::ArmedNight,
            "armed_vacation" => Self::ArmedVacation,
            "armed_custom_bypass" => Self::ArmedCustomBypass,
            "arming" => Self::Arming,
            "pending" => Self::Pending,
            "triggered" => Self::Triggered,
            "unavailable" => Self::Unavailable,
            "unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(
            self,
            Self::ArmedAway
                | Self::ArmedHome
                | Self::ArmedNight
                | Self::ArmedVacation
                | Self::ArmedCustomBypass
        )
    }

    /// Classify the panel state observed after an arm request settled.
    #[must_use]
    pub fn arm_outcome(&self) -> ArmOutcome {
        if self.is_armed() {
            ArmOutcome::Armed
        } else {
            match self {
                Self::Arming | Self::Pending => ArmOutcome::Pending,
                Self::Disarmed => ArmOutcome::StillDisarmed,
                _ => ArmOutcome::Unexpected,
            }
        }
    }
}

/// Result of an arm sequence once the settle delay elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmOutcome {
    /// The panel reports an armed mode.
    Armed,
    /// Exit delay still running; counted as success.
    Pending,
    /// The panel ignored the request.
    StillDisarmed,
    /// The panel reports something neither armed nor disarmed (e.g. `unavailable`).
    Unexpected,
}

impl ArmOutcome {
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Armed | Self::Pending)
    }
}
