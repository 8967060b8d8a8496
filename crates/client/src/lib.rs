//! # Bayan Client
//!
//! Typed access to the remote booking REST API.
//!
//! [`AppointmentApi`] is the seam the enrollment and admin flows depend on;
//! [`ApiClient`] implements it over reqwest and [`MockAppointmentApi`] is the
//! mockall double used in tests.

/// The API trait and its generated mock
pub mod api;
/// Environment-driven client settings
pub mod config;
/// reqwest implementation
pub mod http;
mod normalize;

pub use api::{AppointmentApi, MockAppointmentApi};
pub use config::ClientConfig;
pub use http::ApiClient;
