//! Automation repository port: the engine's view of automation persistence.

use std::future::Future;

use homerunner_domain::automation::Automation;
use homerunner_domain::error::HomeRunnerError;
use homerunner_domain::id::AutomationId;
use homerunner_domain::time::Timestamp;

/// Repository for reading [`Automation`]s and bumping their trigger counters.
///
/// Editing automations belongs to the configuration layer; the engine only
/// needs to load them and record that they fired.
pub trait AutomationRepository {
    /// Create a new automation in storage.
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HomeRunnerError>> + Send;

    /// Get an automation by its unique identifier.
    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, HomeRunnerError>> + Send;

    /// Get all automations flagged active.
    fn get_active(&self) -> impl Future<Output = Result<Vec<Automation>, HomeRunnerError>> + Send;

    /// Increment `trigger_count` and set `last_triggered` to `at`.
    fn record_trigger(
        &self,
        id: AutomationId,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), HomeRunnerError>> + Send;
}

impl<T: AutomationRepository + Send + Sync> AutomationRepository for std::sync::Arc<T> {
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HomeRunnerError>> + Send {
        (**self).create(automation)
    }

    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, HomeRunnerError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_active(&self) -> impl Future<Output = Result<Vec<Automation>, HomeRunnerError>> + Send {
        (**self).get_active()
    }

    fn record_trigger(
        &self,
        id: AutomationId,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), HomeRunnerError>> + Send {
        (**self).record_trigger(id, at)
    }
}
