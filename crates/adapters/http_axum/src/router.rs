//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use homerunner_app::ports::{AutomationRepository, EntityStateClient, EventLog};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the debug API under `/api` next to a `/health` check. Includes a
/// [`TraceLayer`] that logs each HTTP request/response at the `DEBUG` level
/// using the `tracing` ecosystem.
pub fn build<C, L, R>(state: AppState<C, L, R>) -> Router
where
    C: EntityStateClient + Send + Sync + 'static,
    L: EventLog + Send + Sync + 'static,
    R: AutomationRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
