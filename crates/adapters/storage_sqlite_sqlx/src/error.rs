//! Storage-specific error type wrapping sqlx errors.

use homerunner_domain::error::HomeRunnerError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize or deserialize a stored JSON value.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for HomeRunnerError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
