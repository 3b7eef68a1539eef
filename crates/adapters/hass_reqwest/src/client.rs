//! REST implementation of [`EntityStateClient`].

use std::time::Duration;

use reqwest::{Client, StatusCode};

use homerunner_app::ports::EntityStateClient;
use homerunner_domain::entity::{EntityRef, EntitySnapshot};
use homerunner_domain::error::DeviceError;
use homerunner_domain::service::ServiceCall;

use crate::config::HassConfig;
use crate::error::HassError;

/// Longest rejection body kept in a [`DeviceError::ServiceRejected`].
const MAX_BODY_CHARS: usize = 200;

/// Hub client holding the connection settings and credentials.
#[derive(Clone)]
pub struct HassClient {
    http: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for HassClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HassClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HassClient {
    /// Build a client from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HassError`] if the token or base URL is missing, or the HTTP
    /// client cannot be created.
    pub fn new(config: HassConfig) -> Result<Self, HassError> {
        if config.token.trim().is_empty() {
            return Err(HassError::MissingToken);
        }
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(HassError::MissingBaseUrl);
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(HassError::Client)?;

        Ok(Self {
            http,
            base_url,
            token: config.token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn classify(err: &reqwest::Error) -> DeviceError {
    if err.is_timeout() {
        DeviceError::Timeout
    } else {
        DeviceError::Transport(err.to_string())
    }
}

impl EntityStateClient for HassClient {
    async fn get_state(&self, entity_id: &EntityRef) -> Result<EntitySnapshot, DeviceError> {
        let response = self
            .http
            .get(self.url(&format!("/api/states/{entity_id}")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| classify(&err))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DeviceError::NotFound(entity_id.to_string()));
        }
        if !status.is_success() {
            tracing::debug!(entity_id = %entity_id, %status, "unexpected status reading state");
            return Err(DeviceError::Transport(format!("unexpected status {status}")));
        }

        response
            .json::<EntitySnapshot>()
            .await
            .map_err(|err| classify(&err))
    }

    async fn invoke_action(&self, call: &ServiceCall) -> Result<(), DeviceError> {
        tracing::debug!(%call, "invoking service");
        let response = self
            .http
            .post(self.url(&format!("/api/services/{}/{}", call.domain, call.service)))
            .bearer_auth(&self.token)
            .json(&call.body())
            .send()
            .await
            .map_err(|err| classify(&err))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(DeviceError::ServiceRejected {
            status: status.as_u16(),
            body: body.chars().take(MAX_BODY_CHARS).collect(),
        })
    }
}
