//! # Bayan App
//!
//! The two stateful flows built on [`bayan_client::AppointmentApi`]:
//!
//! - **enrollment**: the student wizard from email verification to a booked
//!   subscription
//! - **admin**: the dashboard over subscriptions, users and plans
//! - **order_store**: local plan order overrides the dashboard keeps
//! - **config**: application settings read from the environment

pub mod admin;
pub mod config;
pub mod enrollment;
pub mod order_store;

pub use admin::{AdminDashboard, PaymentFilter, PendingAction, ReorderOutcome};
pub use config::{AppConfig, SlotWindow};
pub use enrollment::{EnrollmentWizard, Step, SubmissionFailure, WizardSettings};
pub use order_store::PlanOrderStore;
