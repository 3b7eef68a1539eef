//! JSON handlers for runner inspection and control.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use homerunner_app::ports::{AutomationRepository, EntityStateClient, EventLog};
use homerunner_app::supervisor::{DebugSnapshot, StartOutcome};
use homerunner_domain::error::{HomeRunnerError, NotFoundError};

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<DebugSnapshot>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<DebugSnapshot>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the start endpoint.
pub enum StartResponse {
    Created(Json<StartOutcome>),
    Ok(Json<StartOutcome>),
    Unprocessable(Json<StartOutcome>),
}

impl From<StartOutcome> for StartResponse {
    fn from(outcome: StartOutcome) -> Self {
        match outcome {
            StartOutcome::Started => Self::Created(Json(outcome)),
            StartOutcome::AlreadyRunning => Self::Ok(Json(outcome)),
            StartOutcome::Unsupported | StartOutcome::Misconfigured(_) => {
                Self::Unprocessable(Json(outcome))
            }
        }
    }
}

impl IntoResponse for StartResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
            Self::Ok(json) => json.into_response(),
            Self::Unprocessable(json) => (StatusCode::UNPROCESSABLE_ENTITY, json).into_response(),
        }
    }
}

/// Possible responses from the stop endpoint.
pub enum StopResponse {
    NoContent,
}

impl IntoResponse for StopResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

fn runner_not_found(id: &str) -> ApiError {
    ApiError::from(HomeRunnerError::from(NotFoundError {
        entity: "Runner",
        id: id.to_string(),
    }))
}

/// `GET /api/runners`: debug snapshots of every runner.
pub async fn list<C, L, R>(State(state): State<AppState<C, L, R>>) -> ListResponse
where
    C: EntityStateClient + Send + Sync + 'static,
    L: EventLog + Send + Sync + 'static,
    R: AutomationRepository + Send + Sync + 'static,
{
    ListResponse::Ok(Json(state.supervisor.list_debug_info().await))
}

/// `GET /api/runners/{id}`: debug snapshot of one runner.
pub async fn get<C, L, R>(
    State(state): State<AppState<C, L, R>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    C: EntityStateClient + Send + Sync + 'static,
    L: EventLog + Send + Sync + 'static,
    R: AutomationRepository + Send + Sync + 'static,
{
    let automation_id = parse_id(&id)?;
    let snapshot = state
        .supervisor
        .get_debug_info(automation_id)
        .await
        .ok_or_else(|| runner_not_found(&id))?;
    Ok(GetResponse::Ok(Json(snapshot)))
}

/// `POST /api/runners/{id}/start`: load the automation and start its runner.
pub async fn start<C, L, R>(
    State(state): State<AppState<C, L, R>>,
    Path(id): Path<String>,
) -> Result<StartResponse, ApiError>
where
    C: EntityStateClient + Send + Sync + 'static,
    L: EventLog + Send + Sync + 'static,
    R: AutomationRepository + Send + Sync + 'static,
{
    let automation_id = parse_id(&id)?;
    let outcome = state.supervisor.start_by_id(automation_id).await?;
    Ok(StartResponse::from(outcome))
}

/// `POST /api/runners/{id}/stop`: stop and forget a runner.
pub async fn stop<C, L, R>(
    State(state): State<AppState<C, L, R>>,
    Path(id): Path<String>,
) -> Result<StopResponse, ApiError>
where
    C: EntityStateClient + Send + Sync + 'static,
    L: EventLog + Send + Sync + 'static,
    R: AutomationRepository + Send + Sync + 'static,
{
    let automation_id = parse_id(&id)?;
    if state.supervisor.stop(automation_id).await {
        Ok(StopResponse::NoContent)
    } else {
        Err(runner_not_found(&id))
    }
}
