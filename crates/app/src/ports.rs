//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the runner engine and the outside world.
//! They are defined here (in `app`) so that both the engine and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod automation_repo;
pub mod clock;
pub mod entity_client;
pub mod event_log;

pub use automation_repo::AutomationRepository;
pub use clock::{Clock, SystemClock};
pub use entity_client::EntityStateClient;
pub use event_log::EventLog;
