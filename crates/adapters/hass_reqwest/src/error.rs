//! Hub adapter error types.

/// Errors raised while building the hub client.
///
/// Request-time failures are reported as
/// [`DeviceError`](homerunner_domain::error::DeviceError) through the port.
#[derive(Debug, thiserror::Error)]
pub enum HassError {
    /// No access token was configured.
    #[error("hub access token is not configured")]
    MissingToken,

    /// The base URL is empty.
    #[error("hub base url is not configured")]
    MissingBaseUrl,

    /// The underlying HTTP client could not be created.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
}
