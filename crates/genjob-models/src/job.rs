//! Job definitions: inbound requests, validated descriptors and lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use crate::error::{ModelError, ModelResult};
use crate::module::{ModuleId, ModuleRegistry};

/// Maximum length of externally supplied identifiers.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// User id used in storage paths when the caller does not supply one.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Opaque, externally generated job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Raw job request body as posted by the issuing backend.
///
/// Every field is optional at the wire level so that a missing `job_id` or
/// `module` surfaces as a validation error rather than a decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct JobRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "job_id is required"),
        custom(function = "validate_identifier")
    )]
    pub job_id: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "module is required"))]
    pub module: String,

    #[serde(default)]
    pub params: Option<Map<String, Value>>,

    #[serde(default)]
    #[validate(custom(function = "validate_identifier"))]
    pub user_id: Option<String>,
}

impl JobRequest {
    /// Validate the request and resolve its module against the registry.
    ///
    /// No provider is contacted here; this is the synchronous accept/reject
    /// decision made before the job enters the pipeline.
    pub fn into_descriptor(self, registry: &ModuleRegistry) -> ModelResult<JobDescriptor> {
        self.validate()
            .map_err(|e| ModelError::validation(first_validation_message(&e)))?;

        let config = registry.lookup(&self.module)?;

        let user_id = self
            .user_id
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());

        Ok(JobDescriptor {
            job_id: JobId(self.job_id),
            module: config.id,
            params: self.params.unwrap_or_default(),
            user_id,
        })
    }
}

/// Identifiers end up in storage keys and callback URLs, so they are
/// restricted to a path-safe alphabet.
fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        let mut err = ValidationError::new("identifier_too_long");
        err.message = Some("identifier exceeds 128 characters".into());
        return Err(err);
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        let mut err = ValidationError::new("identifier_charset");
        err.message = Some("identifier may only contain letters, digits, '-' and '_'".into());
        return Err(err);
    }
    Ok(())
}

fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<(String, _)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| (field.to_string(), errs))
        .collect();
    // Stable ordering so job_id problems are reported before module problems.
    fields.sort_by_key(|(field, _)| match field.as_str() {
        "job_id" => 0,
        "module" => 1,
        _ => 2,
    });

    fields
        .into_iter()
        .find_map(|(field, errs)| {
            errs.first().map(|e| match &e.message {
                Some(msg) if msg.contains(field.as_str()) => msg.to_string(),
                Some(msg) => format!("{}: {}", field, msg),
                None => format!("{} is invalid", field),
            })
        })
        .unwrap_or_else(|| "invalid request".to_string())
}

/// A validated, immutable job accepted by the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: JobId,
    pub module: ModuleId,
    /// Untyped module parameters, parsed into `ModuleParams` by the pipeline.
    pub params: Map<String, Value>,
    pub user_id: String,
}

/// Generation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Preview,
    Final,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Preview => "preview",
            JobStage::Final => "final",
        }
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, JobStage::Preview)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator state for a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Received,
    PreviewGenerating,
    PreviewUploading,
    PreviewNotified,
    FinalGenerating,
    FinalUploading,
    Completed,
    Failed,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Received => "received",
            JobPhase::PreviewGenerating => "preview_generating",
            JobPhase::PreviewUploading => "preview_uploading",
            JobPhase::PreviewNotified => "preview_notified",
            JobPhase::FinalGenerating => "final_generating",
            JobPhase::FinalUploading => "final_uploading",
            JobPhase::Completed => "completed",
            JobPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// Preview phases may be skipped (no deliverable preview), so
    /// `PreviewGenerating` and `PreviewUploading` can both jump straight to
    /// `FinalGenerating`. `Failed` is reachable from every non-terminal phase.
    pub fn can_transition_to(&self, next: JobPhase) -> bool {
        use JobPhase::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }

        matches!(
            (self, next),
            (Received, PreviewGenerating)
                | (PreviewGenerating, PreviewUploading)
                | (PreviewGenerating, FinalGenerating)
                | (PreviewUploading, PreviewNotified)
                | (PreviewUploading, FinalGenerating)
                | (PreviewNotified, FinalGenerating)
                | (FinalGenerating, FinalUploading)
                | (FinalUploading, Completed)
        )
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
