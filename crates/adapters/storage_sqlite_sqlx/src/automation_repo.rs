//! `SQLite` implementation of [`AutomationRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use homerunner_app::ports::AutomationRepository;
use homerunner_domain::automation::{Automation, AutomationKind, Settings};
use homerunner_domain::error::{HomeRunnerError, NotFoundError};
use homerunner_domain::id::AutomationId;
use homerunner_domain::time::Timestamp;

use crate::error::StorageError;
use crate::{decode_timestamp, encode_timestamp};

struct Wrapper(Automation);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Automation> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let kind: String = row.try_get("type")?;
        let settings_json: String = row.try_get("settings")?;
        let is_active: bool = row.try_get("is_active")?;
        let trigger_count: i64 = row.try_get("trigger_count")?;
        let last_triggered: Option<String> = row.try_get("last_triggered")?;

        let kind: AutomationKind = kind
            .parse()
            .map_err(|err: String| sqlx::Error::Decode(err.into()))?;
        let settings: Settings = serde_json::from_str(&settings_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let last_triggered = last_triggered
            .as_deref()
            .map(decode_timestamp)
            .transpose()?;

        Ok(Self(Automation {
            id: AutomationId::from_uuid(id),
            name,
            kind,
            settings,
            is_active,
            trigger_count: u64::try_from(trigger_count).unwrap_or_default(),
            last_triggered,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO automations (id, name, type, settings, is_active, trigger_count, last_triggered)
    VALUES (?, ?, ?, ?, ?, ?, ?)
";
const SELECT_BY_ID: &str = "SELECT * FROM automations WHERE id = ?";
const SELECT_ACTIVE: &str = "SELECT * FROM automations WHERE is_active = 1 ORDER BY name";
const RECORD_TRIGGER: &str =
    "UPDATE automations SET trigger_count = trigger_count + 1, last_triggered = ? WHERE id = ?";

/// `SQLite`-backed automation repository.
pub struct SqliteAutomationRepository {
    pool: SqlitePool,
}

impl SqliteAutomationRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AutomationRepository for SqliteAutomationRepository {
    async fn create(&self, automation: Automation) -> Result<Automation, HomeRunnerError> {
        automation.validate()?;
        let settings_json =
            serde_json::to_string(&automation.settings).map_err(StorageError::from)?;

        sqlx::query(INSERT)
            .bind(automation.id.as_uuid())
            .bind(&automation.name)
            .bind(automation.kind.as_str())
            .bind(&settings_json)
            .bind(automation.is_active)
            .bind(i64::try_from(automation.trigger_count).unwrap_or(i64::MAX))
            .bind(automation.last_triggered.map(encode_timestamp))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(automation)
    }

    async fn get_by_id(&self, id: AutomationId) -> Result<Option<Automation>, HomeRunnerError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn get_active(&self) -> Result<Vec<Automation>, HomeRunnerError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ACTIVE)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn record_trigger(&self, id: AutomationId, at: Timestamp) -> Result<(), HomeRunnerError> {
        let result = sqlx::query(RECORD_TRIGGER)
            .bind(encode_timestamp(at))
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(NotFoundError {
                entity: "Automation",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
