//! Service calls: imperative commands sent to the hub.

use serde::{Deserialize, Serialize};

use crate::entity::EntityRef;

/// A `domain.service` invocation targeting a single entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub entity_id: EntityRef,
    /// Extra payload merged next to `entity_id` in the request body.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl ServiceCall {
    #[must_use]
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
        entity_id: EntityRef,
    ) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            entity_id,
            data: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn light_turn_on(light: EntityRef) -> Self {
        Self::new("light", "turn_on", light)
    }

    #[must_use]
    pub fn light_turn_off(light: EntityRef) -> Self {
        Self::new("light", "turn_off", light)
    }

    /// Arm an alarm panel in the given mode, forwarding the optional user code.
    #[must_use]
    pub fn alarm_arm(panel: EntityRef, mode: ArmMode, code: Option<&str>) -> Self {
        let call = Self::new("alarm_control_panel", mode.service(), panel);
        match code {
            Some(code) => call.with_data("code", serde_json::Value::from(code)),
            None => call,
        }
    }

    /// Request body as posted to the hub: `{"entity_id": …, ...data}`.
    #[must_use]
    pub fn body(&self) -> serde_json::Value {
        let mut body = self.data.clone();
        body.insert(
            "entity_id".to_string(),
            serde_json::Value::from(self.entity_id.as_str()),
        );
        serde_json::Value::Object(body)
    }
}

impl std::fmt::Display for ServiceCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}({})", self.domain, self.service, self.entity_id)
    }
}

/// Arming mode requested from an alarm panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmMode {
    #[default]
    Away,
    Home,
    Night,
}

impl ArmMode {
    #[must_use]
    pub fn service(self) -> &'static str {
        match self {
            Self::Away => "alarm_arm_away",
            Self::Home => "alarm_arm_home",
            Self::Night => "alarm_arm_night",
        }
    }
}

impl std::str::FromStr for ArmMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "away" => Ok(Self::Away),
            "home" => Ok(Self::Home),
            "night" => Ok(Self::Night),
            other => Err(format!("unknown arm mode `{other}`")),
        }
    }
}

/// What to try when the primary arm request is rejected.
///
/// Only one policy exists: a panel refusing `away` with a server error gets
/// exactly one `home` attempt. Client errors and other modes never fall back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmFallback {
    #[default]
    ArmHomeOnServerError,
    None,
}

impl ArmFallback {
    /// Mode to retry with, if any, given the primary mode and its failure.
    #[must_use]
    pub fn next_mode(self, primary: ArmMode, error: &crate::error::DeviceError) -> Option<ArmMode> {
        match self {
            Self::ArmHomeOnServerError if primary == ArmMode::Away && error.is_server_error() => {
                Some(ArmMode::Home)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;

    fn panel() -> EntityRef {
        EntityRef::parse("alarm_control_panel.house").unwrap()
    }

    #[test]
    fn should_build_light_calls() {
        let light = EntityRef::parse("light.l1").unwrap();
        let on = ServiceCall::light_turn_on(light.clone());
        assert_eq!(on.to_string(), "light.turn_on(light.l1)");
        let off = ServiceCall::light_turn_off(light);
        assert_eq!(off.service, "turn_off");
    }

    #[test]
    fn should_merge_entity_id_into_body() {
        let call = ServiceCall::alarm_arm(panel(), ArmMode::Away, Some("1234"));
        assert_eq!(
            call.body(),
            serde_json::json!({"entity_id": "alarm_control_panel.house", "code": "1234"})
        );
    }

    #[test]
    fn should_omit_code_when_absent() {
        let call = ServiceCall::alarm_arm(panel(), ArmMode::Night, None);
        assert_eq!(call.service, "alarm_arm_night");
        assert_eq!(
            call.body(),
            serde_json::json!({"entity_id": "alarm_control_panel.house"})
        );
    }

    #[test]
    fn should_fall_back_to_home_on_server_error_for_away() {
        let err = DeviceError::ServiceRejected {
            status: 500,
            body: String::new(),
        };
        assert_eq!(
            ArmFallback::ArmHomeOnServerError.next_mode(ArmMode::Away, &err),
            Some(ArmMode::Home)
        );
    }

    #[test]
    fn should_not_fall_back_on_client_error_or_timeout() {
        let rejected = DeviceError::ServiceRejected {
            status: 401,
            body: String::new(),
        };
        let policy = ArmFallback::ArmHomeOnServerError;
        assert_eq!(policy.next_mode(ArmMode::Away, &rejected), None);
        assert_eq!(policy.next_mode(ArmMode::Away, &DeviceError::Timeout), None);
    }

    #[test]
    fn should_not_fall_back_from_other_modes() {
        let err = DeviceError::ServiceRejected {
            status: 503,
            body: String::new(),
        };
        assert_eq!(
            ArmFallback::ArmHomeOnServerError.next_mode(ArmMode::Night, &err),
            None
        );
        assert_eq!(ArmFallback::None.next_mode(ArmMode::Away, &err), None);
    }

    #[test]
    fn should_parse_arm_mode() {
        assert_eq!("home".parse::<ArmMode>().unwrap(), ArmMode::Home);
        assert!("vacation".parse::<ArmMode>().is_err());
    }
}
