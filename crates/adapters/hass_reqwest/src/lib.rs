//! # homerunner-adapter-hass-reqwest
//!
//! Hub adapter: talks to a Home Assistant compatible REST API with
//! [reqwest](https://docs.rs/reqwest).
//!
//! ## Responsibilities
//! - Implement the `EntityStateClient` port defined in `homerunner-app::ports`
//! - Hold the hub credentials so runners never see them
//! - Bound every request with a timeout and classify failures into
//!   `DeviceError` variants
//!
//! ## Dependency rule
//! Same as other adapters: depends on `homerunner-app` and `homerunner-domain`.

mod client;
mod config;
mod error;

pub use client::HassClient;
pub use config::HassConfig;
pub use error::HassError;
