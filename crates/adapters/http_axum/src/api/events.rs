//! JSON handler for the event log.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use homerunner_app::ports::{AutomationRepository, EntityStateClient, EventLog};
use homerunner_domain::event::EventLogEntry;

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 200;

/// Query parameters for the events endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

/// `GET /api/automations/{id}/events`: most recent events, newest first.
pub async fn list<C, L, R>(
    State(state): State<AppState<C, L, R>>,
    Path(id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<EventLogEntry>>, ApiError>
where
    C: EntityStateClient + Send + Sync + 'static,
    L: EventLog + Send + Sync + 'static,
    R: AutomationRepository + Send + Sync + 'static,
{
    let automation_id = parse_id(&id)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let events = state
        .supervisor
        .recent_events(automation_id, limit)
        .await?;
    Ok(Json(events))
}
