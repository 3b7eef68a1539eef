//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use homerunner_domain::error::HomeRunnerError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps request and domain failures to an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// A path segment could not be parsed as an identifier.
    InvalidId(String),
    Domain(HomeRunnerError),
}

impl From<HomeRunnerError> for ApiError {
    fn from(err: HomeRunnerError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidId(raw) => (StatusCode::BAD_REQUEST, format!("invalid id {raw:?}")),
            Self::Domain(HomeRunnerError::Validation(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Domain(HomeRunnerError::NotFound(err)) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            Self::Domain(HomeRunnerError::Configuration(err)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            Self::Domain(HomeRunnerError::Device(err)) => {
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            Self::Domain(HomeRunnerError::Storage(err)) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
