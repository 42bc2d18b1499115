//! Generation job worker.
//!
//! This crate provides:
//! - The two-phase (preview, final) job orchestrator
//! - Detached job execution with a panic boundary and per-phase timeouts
//! - Structured job logging and pipeline metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;


pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use orchestrator::{CallbackAttempt, JobOrchestrator, JobOutcome};
