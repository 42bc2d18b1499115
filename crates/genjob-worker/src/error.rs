//! Worker error types.

use std::time::Duration;

use thiserror::Error;

use genjob_models::{JobStage, ParamsError};

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Anything that ends a job in the `Failed` state. The `Display` text is
/// what the issuing backend receives as `error_message`.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    InvalidParams(#[from] ParamsError),

    #[error(transparent)]
    Provider(#[from] genjob_providers::ProviderError),

    #[error("{stage} generation timed out after {}s", .timeout.as_secs())]
    PhaseTimeout { stage: JobStage, timeout: Duration },

    #[error("no final assets were uploaded")]
    NoFinalAssets,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable tag reported as `worker_meta.error_type`.
    pub fn error_type(&self) -> &'static str {
        match self {
            WorkerError::InvalidParams(_) => "invalid_params",
            WorkerError::Provider(e) => e.error_type(),
            WorkerError::PhaseTimeout { .. } => "phase_timeout",
            WorkerError::NoFinalAssets => "no_assets",
            WorkerError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_and_tags() {
        let err = WorkerError::NoFinalAssets;
        assert_eq!(err.to_string(), "no final assets were uploaded");
        assert_eq!(err.error_type(), "no_assets");

        let err = WorkerError::PhaseTimeout {
            stage: JobStage::Final,
            timeout: Duration::from_secs(600),
        };
        assert_eq!(err.to_string(), "final generation timed out after 600s");
        assert_eq!(err.error_type(), "phase_timeout");

        let err = WorkerError::from(ParamsError::missing("avatar-video", "audio_url"));
        assert_eq!(err.to_string(), "audio_url is required for avatar-video");
        assert_eq!(err.error_type(), "invalid_params");
    }
}
