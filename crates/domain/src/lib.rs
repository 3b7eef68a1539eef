//! # homerunner-domain
//!
//! Pure domain model for the homerunner automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps,
//!   daily time windows
//! - Define **Automations** (the read-only snapshot a runner is built from)
//!   and their typed settings
//! - Define **Entity snapshots** and the interpreted states runners branch on
//!   (binary sensors, alarm panels)
//! - Define **Service calls** sent to the hub, including the arm fallback policy
//! - Define the per-runner **History ring** and the durable **Event log** records
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod automation;
pub mod entity;
pub mod event;
pub mod history;
pub mod service;
