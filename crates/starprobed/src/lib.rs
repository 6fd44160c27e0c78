//! HTTP surface for the starprobe measurement service.
//!
//! This crate is thin wiring around `starprobe-core`:
//! - Environment configuration
//! - Route table and middleware
//! - Request/response mapping for the four measurement endpoints

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{CorsOrigins, DaemonConfig};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
