//! Shared data models for the generation-job worker.
//!
//! This crate provides Serde-serializable types for:
//! - Inbound job requests and validated job descriptors
//! - The module registry (module -> provider/model)
//! - Typed per-module generation parameters
//! - Normalized generation results and uploaded assets
//! - Callback payloads sent to the issuing backend

pub mod asset;
pub mod callback;
pub mod error;
pub mod generation;
pub mod job;
pub mod module;
pub mod params;

// Re-export common types
pub use asset::{AssetKind, AssetMetadata, UploadedAsset};
pub use callback::{
    AssetSummary, CompletedMeta, CompletionPayload, FailedMeta, PreviewReadyPayload,
};
pub use error::{ModelError, ModelResult, ParamsError, RegistryError};
pub use generation::{
    AudioResult, GenerationResult, ImagePromptResult, TextResult, TokenUsage, VideoResult,
};
pub use job::{JobDescriptor, JobId, JobPhase, JobRequest, JobStage};
pub use module::{ModuleConfig, ModuleId, ModuleRegistry, ProviderKind};
pub use params::{
    AvatarVideoParams, ChatParams, ImagePromptParams, ImageToVideoParams, ModuleParams,
    SpeechParams, SpeechToVideoParams,
};
