//! Model-level error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while turning an inbound request into a job descriptor.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid job request: {0}")]
    Validation(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ModelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Module registry lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown module: {0}")]
    UnknownModule(String),
}

/// Per-module parameter validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("{field} is required for {module}")]
    Missing { module: String, field: String },

    #[error("{field} for {module} must be {expected}")]
    InvalidType {
        module: String,
        field: String,
        expected: String,
    },

    #[error("{field} for {module} is not a valid URL: {value}")]
    InvalidUrl {
        module: String,
        field: String,
        value: String,
    },
}

impl ParamsError {
    pub fn missing(module: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Missing {
            module: module.into(),
            field: field.into(),
        }
    }

    pub fn invalid_type(
        module: impl Into<String>,
        field: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidType {
            module: module.into(),
            field: field.into(),
            expected: expected.into(),
        }
    }

    /// Name of the offending parameter.
    pub fn field(&self) -> &str {
        match self {
            ParamsError::Missing { field, .. }
            | ParamsError::InvalidType { field, .. }
            | ParamsError::InvalidUrl { field, .. } => field,
        }
    }
}
