//! Job submission handler.

use std::panic::{catch_unwind, AssertUnwindSafe};

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;

use genjob_models::JobRequest;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response for an accepted job.
#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub success: bool,
    pub message: String,
    pub job_id: String,
    /// Display estimate from the module registry.
    pub estimated_seconds: u32,
}

/// Validate a job and start it in the background.
///
/// The response only says the job was accepted; the outcome reaches the
/// issuing backend through callbacks.
pub async fn submit_job(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<JobAccepted>> {
    let request: JobRequest = serde_json::from_slice(&body)?;

    let orchestrator = &state.orchestrator;
    let job = catch_unwind(AssertUnwindSafe(|| orchestrator.accept(request)))
        .map_err(|_| {
            ApiError::internal("job validation panicked").sanitized(state.config.is_production())
        })??;

    let estimated_seconds = orchestrator
        .registry()
        .get(job.module)
        .map(|config| config.avg_time_seconds)
        .unwrap_or_default();
    let job_id = job.job_id.to_string();

    info!(
        job_id = %job_id,
        module = %job.module,
        user_id = %job.user_id,
        "Job accepted"
    );

    // Tracked by the orchestrator; the pipeline owns its terminal callback
    orchestrator.spawn(job);

    Ok(Json(JobAccepted {
        success: true,
        message: "Job processing started".to_string(),
        job_id,
        estimated_seconds,
    }))
}

/// Answers a bare `OPTIONS` that is not a CORS preflight.
pub async fn job_options() -> StatusCode {
    StatusCode::NO_CONTENT
}
