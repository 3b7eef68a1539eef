//! Shared application state for axum handlers.

use std::sync::Arc;

use homerunner_app::supervisor::RunnerSupervisor;

/// Application state shared across all axum handlers.
///
/// Generic over the port types to avoid dynamic dispatch. `Clone` is
/// implemented manually so the underlying types themselves do not need to be
/// `Clone`: only the `Arc` wrapper is cloned.
pub struct AppState<C, L, R> {
    /// Registry of live runners.
    pub supervisor: Arc<RunnerSupervisor<C, L, R>>,
}

impl<C, L, R> Clone for AppState<C, L, R> {
    fn clone(&self) -> Self {
        Self {
            supervisor: Arc::clone(&self.supervisor),
        }
    }
}

impl<C, L, R> AppState<C, L, R> {
    /// Create a new application state around a supervisor already shared
    /// with the rest of the process.
    pub fn new(supervisor: Arc<RunnerSupervisor<C, L, R>>) -> Self {
        Self { supervisor }
    }
}
