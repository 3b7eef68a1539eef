//! # homerunner-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `AutomationRepository` and `EventLog` ports defined in
//!   `homerunner-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `homerunner-app` (for port traits) and `homerunner-domain` (for
//! domain types). The `app` and `domain` crates must never reference this
//! adapter.

mod automation_repo;
mod error;
mod event_log;
mod pool;

pub use automation_repo::SqliteAutomationRepository;
pub use error::StorageError;
pub use event_log::SqliteEventLog;
pub use pool::{Config, Database};

/// Timestamps are stored as fixed-width RFC 3339 so they sort as text.
pub(crate) fn encode_timestamp(ts: homerunner_domain::time::Timestamp) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(
    raw: &str,
) -> Result<homerunner_domain::time::Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.to_utc())
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}
