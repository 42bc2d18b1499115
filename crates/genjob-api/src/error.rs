//! API error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use genjob_models::ModelError;

pub type ApiResult<T> = Result<T, ApiError>;

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Mark an internal error for production so its details stay in the logs.
    pub fn sanitized(self, is_production: bool) -> Self {
        match self {
            ApiError::Internal(_) if is_production => {
                ApiError::Internal("An internal error occurred".to_string())
            }
            other => other,
        }
    }
}

/// Body for 500 responses.
#[derive(Serialize)]
struct InternalErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            // The issuing backend reads the 400 body as the rejection reason
            ApiError::BadRequest(message) => {
                tracing::debug!("Rejected job request: {}", message);
                (status, message).into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                let body = InternalErrorBody {
                    success: false,
                    error: message,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid JSON body: {}", e))
    }
}
