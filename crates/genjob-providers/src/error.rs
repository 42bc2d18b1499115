//! Provider error types.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failures raised by provider adapters. None of these are retried inside
/// the adapter; the caller decides what a failed phase means.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Missing credential: {0} is not configured")]
    MissingCredential(String),

    #[error("Module {module} is not supported by the {provider} provider")]
    Unsupported { module: String, provider: String },

    #[error("Provider returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Provider job failed: {0}")]
    JobFailed(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Provider returned an empty result: {0}")]
    EmptyResult(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ProviderError {
    pub fn missing_credential(name: impl Into<String>) -> Self {
        Self::MissingCredential(name.into())
    }

    pub fn unsupported(module: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::Unsupported {
            module: module.into(),
            provider: provider.into(),
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn empty_result(msg: impl Into<String>) -> Self {
        Self::EmptyResult(msg.into())
    }

    /// Stable tag reported in failure callbacks.
    pub fn error_type(&self) -> &'static str {
        match self {
            ProviderError::MissingCredential(_) => "missing_credential",
            ProviderError::Unsupported { .. } => "unsupported_module",
            ProviderError::Upstream { .. } => "provider_error",
            ProviderError::JobFailed(_) => "provider_job_failed",
            ProviderError::InvalidResponse(_) => "invalid_provider_response",
            ProviderError::EmptyResult(_) => "empty_result",
            ProviderError::Network(_) => "network_error",
        }
    }
}

/// Turn a non-success HTTP response into `ProviderError::Upstream`.
pub(crate) async fn ensure_success(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Upstream { status, body })
}
