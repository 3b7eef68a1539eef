//! `SQLite` implementation of [`EventLog`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use homerunner_app::ports::EventLog;
use homerunner_domain::error::HomeRunnerError;
use homerunner_domain::event::{EventLogEntry, EventType};
use homerunner_domain::id::{AutomationId, EventId};

use crate::error::StorageError;
use crate::{decode_timestamp, encode_timestamp};

struct Wrapper(EventLogEntry);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let automation_id: uuid::Uuid = row.try_get("automation_id")?;
        let event_type: String = row.try_get("event_type")?;
        let message: String = row.try_get("message")?;
        let created_at: String = row.try_get("created_at")?;

        let event_type: EventType = event_type
            .parse()
            .map_err(|err: String| sqlx::Error::Decode(err.into()))?;

        Ok(Self(EventLogEntry {
            id: EventId::from_uuid(id),
            automation_id: AutomationId::from_uuid(automation_id),
            event_type,
            message,
            created_at: decode_timestamp(&created_at)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO event_log (id, automation_id, event_type, message, created_at)
    VALUES (?, ?, ?, ?, ?)
";

const SELECT_BY_AUTOMATION: &str = r"
    SELECT * FROM event_log
    WHERE automation_id = ?
    ORDER BY created_at DESC, rowid DESC
    LIMIT ?
";

/// `SQLite`-backed event log.
pub struct SqliteEventLog {
    pool: SqlitePool,
}

impl SqliteEventLog {
    /// Create a new event log using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EventLog for SqliteEventLog {
    async fn append(&self, entry: EventLogEntry) -> Result<EventLogEntry, HomeRunnerError> {
        sqlx::query(INSERT)
            .bind(entry.id.as_uuid())
            .bind(entry.automation_id.as_uuid())
            .bind(entry.event_type.as_str())
            .bind(&entry.message)
            .bind(encode_timestamp(entry.created_at))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(entry)
    }

    async fn recent_for_automation(
        &self,
        automation_id: AutomationId,
        limit: usize,
    ) -> Result<Vec<EventLogEntry>, HomeRunnerError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_AUTOMATION)
            .bind(automation_id.as_uuid())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
