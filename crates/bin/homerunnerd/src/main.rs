//! # homerunnerd: homerunner daemon
//!
//! Composition root that wires all adapters together, starts the automation
//! runners and serves the debug API.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the hub client and repository implementations (adapters)
//! - Start one runner per active automation under a supervisor
//! - Build the axum router around the supervisor, bind and serve
//! - Stop every runner on graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use homerunner_adapter_hass_reqwest::HassClient;
use homerunner_adapter_http_axum::state::AppState;
use homerunner_adapter_storage_sqlite_sqlx::{
    Config as DbConfig, SqliteAutomationRepository, SqliteEventLog,
};
use homerunner_app::ports::SystemClock;
use homerunner_app::runner::RunnerContext;
use homerunner_app::supervisor::RunnerSupervisor;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = DbConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    // Repositories
    let event_log = SqliteEventLog::new(pool.clone());
    let automation_repo = SqliteAutomationRepository::new(pool);

    // Hub
    let client = HassClient::new(config.hub.clone())?;

    // Runners
    let ctx = RunnerContext::new(
        Arc::new(client),
        Arc::new(event_log),
        Arc::new(automation_repo),
        Arc::new(SystemClock),
    )
    .with_config(config.runner.to_runner_config());
    let supervisor = Arc::new(RunnerSupervisor::new(ctx));

    let started = supervisor.start_all_active().await?;
    tracing::info!(started, "runners started");

    // HTTP
    let app = homerunner_adapter_http_axum::router::build(AppState::new(Arc::clone(&supervisor)));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "homerunnerd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    supervisor.stop_all().await;
    tracing::info!("homerunnerd stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
