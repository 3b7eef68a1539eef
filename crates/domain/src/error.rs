//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`HomeRunnerError`] via `#[from]` at port boundaries.

/// Root error type crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum HomeRunnerError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("configuration error")]
    Configuration(#[from] ConfigurationError),

    #[error("device error")]
    Device(#[from] DeviceError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A domain invariant was violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("invalid entity id {0:?}, expected `domain.object_id`")]
    InvalidEntityId(String),

    #[error("invalid time of day {0:?}, expected `HH:MM`")]
    InvalidTimeOfDay(String),
}

/// A lookup did not match any stored record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// An automation's settings cannot drive a runner.
///
/// Fatal at start: the runner is never spawned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("missing required setting `{0}`")]
    MissingSetting(&'static str),

    #[error("setting `{key}` is invalid: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("automation type `{0}` has no runner")]
    UnsupportedKind(String),
}

/// Failure talking to the home-automation hub.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("entity {0} not found on the hub")]
    NotFound(String),

    #[error("request to the hub timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("hub rejected the service call with status {status}")]
    ServiceRejected { status: u16, body: String },
}

impl DeviceError {
    /// Whether the hub itself failed while handling the request (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ServiceRejected { status, .. } if *status >= 500)
    }

    /// Short stable tag used to group identical failures.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::ServiceRejected { .. } => "service_rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_flag_5xx_rejection_as_server_error() {
        let err = DeviceError::ServiceRejected {
            status: 500,
            body: String::new(),
        };
        assert!(err.is_server_error());
    }

    #[test]
    fn should_not_flag_4xx_rejection_as_server_error() {
        let err = DeviceError::ServiceRejected {
            status: 400,
            body: "bad code".to_string(),
        };
        assert!(!err.is_server_error());
        assert!(!DeviceError::Timeout.is_server_error());
    }

    #[test]
    fn should_keep_timeout_distinct_from_transport() {
        assert_eq!(DeviceError::Timeout.kind(), "timeout");
        assert_eq!(DeviceError::Transport("reset".into()).kind(), "transport");
    }

    #[test]
    fn should_display_not_found_error() {
        let err = NotFoundError {
            entity: "Automation",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Automation abc not found");
    }

    #[test]
    fn should_convert_configuration_error_into_root_error() {
        let err: HomeRunnerError = ConfigurationError::MissingSetting("motion_entity").into();
        assert!(matches!(
            err,
            HomeRunnerError::Configuration(ConfigurationError::MissingSetting("motion_entity"))
        ));
    }
}
