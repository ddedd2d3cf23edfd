//! Axum HTTP API server.
//!
//! This crate provides:
//! - Video metadata lookup
//! - Asynchronous and synchronous audio download jobs with status polling
//! - Static serving of finished downloads
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
