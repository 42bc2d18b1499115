//! Application state.

use std::sync::Arc;

use genjob_callback::CallbackNotifier;
use genjob_models::ModuleRegistry;
use genjob_providers::ProviderDispatcher;
use genjob_storage::{AssetFetcher, AssetUploader, R2Client};
use genjob_worker::{JobOrchestrator, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Arc<JobOrchestrator>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let registry = Arc::new(ModuleRegistry::builtin());
        let dispatcher = ProviderDispatcher::from_env()?;

        let storage = Arc::new(R2Client::from_env().await?);
        let uploader = AssetUploader::new(storage, AssetFetcher::from_env()?);

        let notifier = CallbackNotifier::from_env()?;

        let orchestrator = JobOrchestrator::new(
            registry,
            dispatcher,
            uploader,
            notifier,
            WorkerConfig::from_env(),
        );

        Ok(Self::with_orchestrator(config, Arc::new(orchestrator)))
    }

    pub fn with_orchestrator(config: ApiConfig, orchestrator: Arc<JobOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }
}
