//! API endpoint handlers.
//!
//! Each module covers one resource. Handlers stay thin and delegate to
//! the service modules through `CoreState::with_conn`.

pub mod auth;
pub mod doctors;
pub mod doses;
pub mod health;
pub mod medications;
pub mod profile;
pub mod reminders;
