//! Provider adapter trait.

use async_trait::async_trait;

use genjob_models::{GenerationResult, JobStage, ModuleConfig, ModuleId, ModuleParams, ProviderKind};

use crate::error::ProviderResult;

/// A third-party generation backend.
///
/// `generate` builds the provider request for the given stage, waits for the
/// provider to finish (including any upstream queue) and normalizes the
/// response into a `GenerationResult`.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether this adapter knows how to build requests for `module`.
    fn supports(&self, module: ModuleId) -> bool;

    async fn generate(
        &self,
        config: &ModuleConfig,
        params: &ModuleParams,
        stage: JobStage,
    ) -> ProviderResult<GenerationResult>;
}
