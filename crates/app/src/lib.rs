//! # homerunner-app
//!
//! Application layer: the runner engine and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `EntityStateClient`: read entity state and invoke services on the hub
//!   - `EventLog`: append & query runner events
//!   - `AutomationRepository`: load automations, record triggers
//!   - `Clock`: injectable time source
//! - Run one **runner** task per automation:
//!   - edge-triggered motion → light
//!   - scheduled-window alarm auto-arm
//! - Supervise runners: start, stop, debug snapshots
//!
//! ## Dependency rule
//! Depends on `homerunner-domain` only (plus `tokio` for tasks, channels and
//! timers). Never imports adapter crates. Adapters depend on *this* crate,
//! not the reverse.

pub mod ports;
pub mod runner;
pub mod supervisor;

#[cfg(test)]
mod test_support;
