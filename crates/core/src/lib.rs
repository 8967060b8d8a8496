//! # Bayan Core
//!
//! Shared domain types and booking rules for the Bayan enrollment client.
//!
//! - **errors**: the error taxonomy every crate returns
//! - **models**: wire types exchanged with the remote booking API
//! - **timezone**: provider (Cairo) to viewer timezone conversion
//! - **slots**: half-hour slot generation over the provider's working hours
//! - **booking**: weekly quotas, conflict checks and calendar states
//! - **regions**: static country/region to IANA timezone tables

pub mod booking;
pub mod errors;
pub mod models;
pub mod regions;
pub mod slots;
pub mod timezone;
