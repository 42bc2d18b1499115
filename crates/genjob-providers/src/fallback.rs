//! Fallback adapter for modules without a real integration.

use async_trait::async_trait;
use tracing::info;

use genjob_models::{
    GenerationResult, JobStage, ModuleConfig, ModuleId, ModuleParams, ProviderKind, TextResult,
};

use crate::error::ProviderResult;
use crate::provider::GenerationProvider;

pub const PLACEHOLDER_MODEL: &str = "placeholder";

/// Answers every request with a fixed notice so the job still completes.
#[derive(Debug, Clone, Default)]
pub struct FallbackProvider;

impl FallbackProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn message_for(module: ModuleId) -> String {
        format!("Generation for module '{}' is not yet available.", module)
    }
}

#[async_trait]
impl GenerationProvider for FallbackProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Fallback
    }

    fn supports(&self, _module: ModuleId) -> bool {
        true
    }

    async fn generate(
        &self,
        config: &ModuleConfig,
        _params: &ModuleParams,
        stage: JobStage,
    ) -> ProviderResult<GenerationResult> {
        info!(module = %config.id, stage = %stage, "Serving placeholder result");

        Ok(GenerationResult::Text(TextResult {
            content: Self::message_for(config.id),
            model: PLACEHOLDER_MODEL.to_string(),
            usage: None,
            preview: stage.is_preview(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genjob_models::ModuleRegistry;
    use serde_json::Map;

    #[tokio::test]
    async fn test_placeholder_for_both_stages() {
        let registry = ModuleRegistry::builtin();
        let config = registry.get(ModuleId::Music).unwrap();
        let params = ModuleParams::Placeholder(Map::new());
        let provider = FallbackProvider::new();

        for stage in [JobStage::Preview, JobStage::Final] {
            let result = provider.generate(config, &params, stage).await.unwrap();
            assert_eq!(result.model(), PLACEHOLDER_MODEL);
            assert_eq!(result.is_preview(), stage.is_preview());
            assert!(result.is_deliverable());
            match result {
                GenerationResult::Text(t) => {
                    assert_eq!(t.content, "Generation for module 'music' is not yet available.")
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }
}
