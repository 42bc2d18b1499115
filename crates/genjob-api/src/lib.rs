//! Axum HTTP entry point.
//!
//! This crate provides:
//! - `POST /api/jobs`, which validates a job and starts it in the background
//! - CORS, request-id and request logging middleware
//! - Health and readiness checks
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
