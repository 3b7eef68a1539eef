//! Hub connection configuration.

use serde::Deserialize;

/// Configuration for the hub REST client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HassConfig {
    /// Base URL of the hub, e.g. `http://homeassistant.local:8123`.
    pub base_url: String,
    /// Long-lived access token sent as a bearer token.
    pub token: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HassConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8123".to_string(),
            token: String::new(),
            timeout_secs: 5,
        }
    }
}
