//! Callback payloads sent to the issuing backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::asset::{AssetMetadata, UploadedAsset};
use crate::generation::TokenUsage;
use crate::module::ModuleId;

/// Body of `POST /api/jobs/{job_id}/preview_ready`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewReadyPayload {
    pub preview_url: String,
    pub preview_urls: Vec<String>,
    pub preview_meta: AssetMetadata,
}

impl PreviewReadyPayload {
    /// Build from a non-empty preview upload.
    pub fn from_asset(asset: &UploadedAsset) -> Option<Self> {
        let primary = asset.primary_url()?;
        Some(Self {
            preview_url: primary.to_string(),
            preview_urls: asset.urls.clone(),
            preview_meta: asset.metadata.clone(),
        })
    }
}

/// Worker metadata on a successful completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedMeta {
    pub module: ModuleId,
    pub provider: String,
    pub model: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<TokenUsage>,
    pub file_count: usize,
    pub processing_time_ms: u64,
    pub completed_at: DateTime<Utc>,
}

/// Worker metadata on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedMeta {
    pub failed_at: DateTime<Utc>,
    pub module: String,
    pub error_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub preview_generated: bool,
    pub final_generated: bool,
    pub total_assets: usize,
}

/// Body of `POST /api/jobs/{job_id}/callback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CompletionPayload {
    Completed {
        final_urls: Vec<String>,
        worker_meta: CompletedMeta,
        generation_type: ModuleId,
        asset_metadata: AssetSummary,
    },
    Failed {
        error_message: String,
        worker_meta: FailedMeta,
    },
}

impl CompletionPayload {
    pub fn failed(
        error_message: impl Into<String>,
        module: impl Into<String>,
        error_type: impl Into<String>,
    ) -> Self {
        CompletionPayload::Failed {
            error_message: error_message.into(),
            worker_meta: FailedMeta {
                failed_at: Utc::now(),
                module: module.into(),
                error_type: error_type.into(),
            },
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            CompletionPayload::Completed { .. } => "completed",
            CompletionPayload::Failed { .. } => "failed",
        }
    }
}
