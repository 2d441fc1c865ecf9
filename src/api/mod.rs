//! JSON HTTP API.
//!
//! Routes are nested under `/api/`. Protected routes pass through
//! Rate Limit → Auth → Audit → Handler; registration, login and health
//! are rate-limited only.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
