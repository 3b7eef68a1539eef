//! # homerunner-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a small **JSON debug API** over the runner supervisor
//!   (`/api/runners`, `/api/automations/{id}/events`, …)
//! - Map HTTP requests into supervisor calls (driving adapter)
//! - Map supervisor results and domain errors into HTTP responses
//!
//! ## Dependency rule
//! Depends on `homerunner-app` (for the supervisor and port traits) and
//! `homerunner-domain` (for types used in request/response mapping). Never
//! leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
