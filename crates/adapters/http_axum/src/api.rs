//! JSON debug API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod events;
#[allow(clippy::missing_errors_doc)]
pub mod runners;

use std::str::FromStr;

use axum::Router;
use axum::routing::{get, post};

use homerunner_app::ports::{AutomationRepository, EntityStateClient, EventLog};
use homerunner_domain::id::AutomationId;

use crate::error::ApiError;
use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<C, L, R>() -> Router<AppState<C, L, R>>
where
    C: EntityStateClient + Send + Sync + 'static,
    L: EventLog + Send + Sync + 'static,
    R: AutomationRepository + Send + Sync + 'static,
{
    Router::new()
        // Runners
        .route("/runners", get(runners::list::<C, L, R>))
        .route("/runners/{id}", get(runners::get::<C, L, R>))
        .route("/runners/{id}/start", post(runners::start::<C, L, R>))
        .route("/runners/{id}/stop", post(runners::stop::<C, L, R>))
        // Events
        .route("/automations/{id}/events", get(events::list::<C, L, R>))
}

pub(crate) fn parse_id(raw: &str) -> Result<AutomationId, ApiError> {
    AutomationId::from_str(raw).map_err(|_| ApiError::InvalidId(raw.to_string()))
}
