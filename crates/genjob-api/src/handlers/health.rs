//! Health check handlers.

use std::collections::HashMap;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Liveness check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: HashMap<String, CheckStatus>,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckStatus {
    fn ok(latency_ms: u64) -> Self {
        Self {
            healthy: true,
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            healthy: false,
            latency_ms: None,
            error: Some(msg.into()),
        }
    }
}

/// Readiness check. Verifies that object storage is reachable.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks = HashMap::new();

    let start = Instant::now();
    let storage = match state.orchestrator.storage().check_connectivity().await {
        Ok(()) => CheckStatus::ok(start.elapsed().as_millis() as u64),
        Err(e) => CheckStatus::error(e.to_string()),
    };
    let all_healthy = storage.healthy;
    checks.insert("storage".to_string(), storage);

    let response = ReadinessResponse {
        status: if all_healthy { "ready" } else { "degraded" }.to_string(),
        checks,
    };

    if all_healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
