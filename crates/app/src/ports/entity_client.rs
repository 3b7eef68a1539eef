//! Entity state client port: reads entity state from, and sends service
//! calls to, the home-automation hub.

use std::future::Future;

use homerunner_domain::entity::{EntityRef, EntitySnapshot};
use homerunner_domain::error::DeviceError;
use homerunner_domain::service::ServiceCall;

/// Client for the hub's entity API.
///
/// Implementations must bound every request with a timeout and report it as
/// [`DeviceError::Timeout`], distinct from transport failures and service
/// rejections. Service calls are idempotent by convention only.
pub trait EntityStateClient {
    /// Fetch the current state of an entity.
    fn get_state(
        &self,
        entity_id: &EntityRef,
    ) -> impl Future<Output = Result<EntitySnapshot, DeviceError>> + Send;

    /// Invoke a service against an entity.
    fn invoke_action(
        &self,
        call: &ServiceCall,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send;
}
