//! Typed views over an automation's free-form settings map.

use std::time::Duration;

use crate::entity::EntityRef;
use crate::error::ConfigurationError;
use crate::service::{ArmFallback, ArmMode};
use crate::time::{DailyWindow, parse_time_of_day};

use super::Settings;

const DEFAULT_DELAY_SECONDS: u64 = 15;
const DEFAULT_COOLDOWN_SECONDS: u64 = 300;
/// Upper bound for delays and cooldowns: one day.
const MAX_DURATION_SECONDS: u64 = 86_400;

/// Settings of an edge-triggered motion → light automation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionLightSettings {
    pub motion_entity: EntityRef,
    pub light_entity: EntityRef,
    /// How long motion must stay clear before the light is turned off.
    pub delay: Duration,
}

impl MotionLightSettings {
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when an entity reference is missing or
    /// malformed, or when `delay_seconds` is not an integer between 0 and
    /// 86 400 (one day).
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigurationError> {
        Ok(Self {
            motion_entity: required_entity(settings, "motion_entity")?,
            light_entity: required_entity(settings, "light_entity")?,
            delay: duration(settings, "delay_seconds", DEFAULT_DELAY_SECONDS)?,
        })
    }
}

/// Settings of a scheduled-window alarm auto-arm automation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmArmSettings {
    pub alarm_entity: EntityRef,
    pub window: DailyWindow,
    /// Minimum time between two arm attempts.
    pub cooldown: Duration,
    pub arm_mode: ArmMode,
    pub fallback: ArmFallback,
    /// Panel code forwarded with arm requests.
    pub code: Option<String>,
}

impl AlarmArmSettings {
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when `alarm_entity` is missing or
    /// malformed, or any optional key holds an invalid value.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigurationError> {
        let defaults = DailyWindow::default();
        let window = DailyWindow::new(
            optional_time(settings, "window_start")?.unwrap_or(defaults.start),
            optional_time(settings, "window_end")?.unwrap_or(defaults.end),
        );
        let arm_mode = match optional_str(settings, "arm_mode")? {
            Some(text) => text
                .parse()
                .map_err(|reason| ConfigurationError::InvalidSetting {
                    key: "arm_mode",
                    reason,
                })?,
            None => ArmMode::default(),
        };
        let fallback = match optional_str(settings, "arm_fallback")? {
            Some("arm_home_on_server_error") | None => ArmFallback::ArmHomeOnServerError,
            Some("none") => ArmFallback::None,
            Some(other) => {
                return Err(ConfigurationError::InvalidSetting {
                    key: "arm_fallback",
                    reason: format!("unknown fallback `{other}`"),
                });
            }
        };

        Ok(Self {
            alarm_entity: required_entity(settings, "alarm_entity")?,
            window,
            cooldown: duration(settings, "cooldown_seconds", DEFAULT_COOLDOWN_SECONDS)?,
            arm_mode,
            fallback,
            code: optional_str(settings, "code")?
                .filter(|code| !code.is_empty())
                .map(str::to_string),
        })
    }
}

fn optional_str<'a>(
    settings: &'a Settings,
    key: &'static str,
) -> Result<Option<&'a str>, ConfigurationError> {
    match settings.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(text)) => Ok(Some(text.as_str())),
        Some(other) => Err(ConfigurationError::InvalidSetting {
            key,
            reason: format!("expected a string, got {other}"),
        }),
    }
}

fn required_entity(
    settings: &Settings,
    key: &'static str,
) -> Result<EntityRef, ConfigurationError> {
    let text = optional_str(settings, key)?
        .filter(|text| !text.trim().is_empty())
        .ok_or(ConfigurationError::MissingSetting(key))?;
    EntityRef::parse(text).map_err(|err| ConfigurationError::InvalidSetting {
        key,
        reason: err.to_string(),
    })
}

fn duration(
    settings: &Settings,
    key: &'static str,
    default_seconds: u64,
) -> Result<Duration, ConfigurationError> {
    let seconds = optional_seconds(settings, key)?.unwrap_or(default_seconds);
    if seconds > MAX_DURATION_SECONDS {
        return Err(ConfigurationError::InvalidSetting {
            key,
            reason: format!("must be at most {MAX_DURATION_SECONDS} seconds, got {seconds}"),
        });
    }
    Ok(Duration::from_secs(seconds))
}

/// Accepts both `30` and `"30"`; forms tend to submit numbers as strings.
fn optional_seconds(
    settings: &Settings,
    key: &'static str,
) -> Result<Option<u64>, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidSetting { key, reason };
    match settings.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(number)) => number
            .as_u64()
            .map(Some)
            .ok_or_else(|| invalid(format!("expected a non-negative integer, got {number}"))),
        Some(serde_json::Value::String(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(format!("expected a non-negative integer, got {text:?}"))),
        Some(other) => Err(invalid(format!("expected a number, got {other}"))),
    }
}

fn optional_time(
    settings: &Settings,
    key: &'static str,
) -> Result<Option<chrono::NaiveTime>, ConfigurationError> {
    optional_str(settings, key)?
        .map(|text| {
            parse_time_of_day(text).map_err(|err| ConfigurationError::InvalidSetting {
                key,
                reason: err.to_string(),
            })
        })
        .transpose()
}
