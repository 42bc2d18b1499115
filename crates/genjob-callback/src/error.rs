//! Callback error types.

use thiserror::Error;

pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Callback configuration error: {0}")]
    Config(String),

    #[error("Callback {route} rejected with {status}: {body}")]
    Rejected {
        route: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to serialize callback payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Callback request failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl NotifyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            NotifyError::Config(_) => "callback_config",
            NotifyError::Rejected { .. } => "callback_rejected",
            NotifyError::Serialize(_) => "callback_serialize",
            NotifyError::Network(_) => "callback_network",
        }
    }
}
