//! Routes each module to the adapter that serves its provider family.

use std::sync::Arc;

use tracing::debug;

use genjob_models::{GenerationResult, JobStage, ModuleConfig, ModuleParams, ProviderKind};

use crate::error::{ProviderError, ProviderResult};
use crate::fallback::FallbackProvider;
use crate::media::QueuedMediaProvider;
use crate::provider::GenerationProvider;
use crate::text::TextCompletionProvider;

/// Holds one adapter per provider family.
#[derive(Clone)]
pub struct ProviderDispatcher {
    text: Arc<dyn GenerationProvider>,
    media: Arc<dyn GenerationProvider>,
    fallback: Arc<dyn GenerationProvider>,
}

impl ProviderDispatcher {
    pub fn new(
        text: Arc<dyn GenerationProvider>,
        media: Arc<dyn GenerationProvider>,
        fallback: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            text,
            media,
            fallback,
        }
    }

    /// Build the production adapters from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Ok(Self::new(
            Arc::new(TextCompletionProvider::from_env()?),
            Arc::new(QueuedMediaProvider::from_env()?),
            Arc::new(FallbackProvider::new()),
        ))
    }

    pub fn adapter_for(&self, kind: ProviderKind) -> &Arc<dyn GenerationProvider> {
        match kind {
            ProviderKind::TextCompletion => &self.text,
            ProviderKind::QueuedMedia => &self.media,
            ProviderKind::Fallback => &self.fallback,
        }
    }

    /// Run one generation phase for a module.
    pub async fn generate(
        &self,
        config: &ModuleConfig,
        params: &ModuleParams,
        stage: JobStage,
    ) -> ProviderResult<GenerationResult> {
        let adapter = self.adapter_for(config.provider);
        if params.module() != config.id || !adapter.supports(config.id) {
            return Err(ProviderError::unsupported(
                config.id.as_str(),
                config.provider.as_str(),
            ));
        }

        debug!(
            module = %config.id,
            provider = %config.provider,
            model = %config.model_id,
            stage = %stage,
            "Dispatching generation"
        );
        adapter.generate(config, params, stage).await
    }

    pub async fn generate_preview(
        &self,
        config: &ModuleConfig,
        params: &ModuleParams,
    ) -> ProviderResult<GenerationResult> {
        self.generate(config, params, JobStage::Preview).await
    }

    pub async fn generate_final(
        &self,
        config: &ModuleConfig,
        params: &ModuleParams,
    ) -> ProviderResult<GenerationResult> {
        self.generate(config, params, JobStage::Final).await
    }
}
