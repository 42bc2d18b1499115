//! Two-phase job pipeline.
//!
//! `Received -> PreviewGenerating -> PreviewUploading -> PreviewNotified ->
//! FinalGenerating -> FinalUploading -> Completed`, with `Failed` reachable
//! from any non-terminal phase. Preview is best effort: any preview problem
//! skips straight to final generation. Every job that enters the pipeline
//! ends with exactly one completion callback.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{info, warn, Instrument};

use genjob_callback::{CallbackNotifier, CallbackRoute, NotifyResult};
use genjob_models::{
    AssetSummary, CompletedMeta, CompletionPayload, GenerationResult, JobDescriptor, JobId,
    JobPhase, JobRequest, JobStage, ModelResult, ModuleConfig, ModuleParams, ModuleRegistry,
    PreviewReadyPayload,
};
use genjob_providers::ProviderDispatcher;
use genjob_storage::{AssetUploader, ObjectStore};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;

/// One callback the pipeline attempted to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackAttempt {
    pub route: CallbackRoute,
    pub delivered: bool,
}

/// What happened to a job, as seen by the worker.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub phase: JobPhase,
    /// Callbacks in the order they were attempted.
    pub callbacks: Vec<CallbackAttempt>,
    pub error_type: Option<&'static str>,
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        self.phase == JobPhase::Completed
    }

    pub fn routes(&self) -> Vec<CallbackRoute> {
        self.callbacks.iter().map(|c| c.route).collect()
    }
}

/// Mutable bookkeeping for a single pipeline run.
struct JobRun {
    logger: JobLogger,
    phase: JobPhase,
    callbacks: Vec<CallbackAttempt>,
    preview_assets: usize,
    error_type: Option<&'static str>,
    started: Instant,
}

impl JobRun {
    fn new(logger: JobLogger) -> Self {
        Self {
            logger,
            phase: JobPhase::Received,
            callbacks: Vec::new(),
            preview_assets: 0,
            error_type: None,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: JobPhase) {
        if !self.phase.can_transition_to(next) {
            warn!(
                job_id = %self.logger.job_id(),
                from = self.phase.as_str(),
                to = next.as_str(),
                "Unexpected job phase transition"
            );
        }
        self.phase = next;
        self.logger.log_phase(next);
    }

    fn terminal_attempted(&self) -> bool {
        self.callbacks
            .iter()
            .any(|c| c.route == CallbackRoute::Completion)
    }

    fn into_outcome(self, job_id: JobId) -> JobOutcome {
        JobOutcome {
            job_id,
            phase: self.phase,
            callbacks: self.callbacks,
            error_type: self.error_type,
        }
    }
}

/// Drives accepted jobs through preview, final and callbacks.
///
/// Jobs share only read-only state. At most `max_concurrent_jobs` run their
/// pipeline at once; every spawned job is tracked until it finishes.
pub struct JobOrchestrator {
    registry: Arc<ModuleRegistry>,
    dispatcher: ProviderDispatcher,
    uploader: AssetUploader,
    notifier: CallbackNotifier,
    config: WorkerConfig,
    job_slots: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl JobOrchestrator {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        dispatcher: ProviderDispatcher,
        uploader: AssetUploader,
        notifier: CallbackNotifier,
        config: WorkerConfig,
    ) -> Self {
        let job_slots = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Self {
            registry,
            dispatcher,
            uploader,
            notifier,
            config,
            job_slots,
            tracker: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStore> {
        self.uploader.store()
    }

    /// Validate an inbound request. Nothing is sent for rejected requests.
    pub fn accept(&self, request: JobRequest) -> ModelResult<JobDescriptor> {
        let job = request.into_descriptor(&self.registry)?;
        metrics::record_job_accepted(job.module);
        Ok(job)
    }

    /// Run the pipeline in a tracked background task.
    ///
    /// The task waits for a free job slot before the pipeline starts.
    pub fn spawn(self: &Arc<Self>, job: JobDescriptor) -> JoinHandle<JobOutcome> {
        let orchestrator = Arc::clone(self);
        let job_slots = Arc::clone(&self.job_slots);
        let span = JobLogger::new(&job.job_id, job.module).create_span();

        self.tracker.spawn(
            async move {
                // The semaphore is never closed, so this only waits
                let _permit = job_slots.acquire_owned().await.ok();
                orchestrator.run(job).await
            }
            .instrument(span),
        )
    }

    /// Jobs spawned and not yet finished, including those waiting for a slot.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every spawned job to send its terminal callback.
    ///
    /// Returns `false` if jobs were still running after `shutdown_timeout`.
    pub async fn drain(&self) -> bool {
        self.drain_within(self.config.shutdown_timeout).await
    }

    pub async fn drain_within(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            info!(pending, "Waiting for in-flight jobs");
        }

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    pending = self.tracker.len(),
                    "In-flight jobs still running after {}s",
                    timeout.as_secs()
                );
                false
            }
        }
    }

    /// Run the pipeline to its terminal callback.
    ///
    /// A panic anywhere inside the pipeline is caught here and still produces
    /// a `failed` callback, unless the completion callback was already tried.
    pub async fn run(&self, job: JobDescriptor) -> JobOutcome {
        let mut run = JobRun::new(JobLogger::new(&job.job_id, job.module));
        run.logger.log_start(&format!("user={}", job.user_id));

        let panicked = AssertUnwindSafe(self.drive(&job, &mut run))
            .catch_unwind()
            .await
            .err()
            .map(|payload| panic_message(payload.as_ref()));

        if let Some(message) = panicked {
            run.logger
                .log_error(&format!("pipeline panicked: {}", message));
            if !run.terminal_attempted() {
                self.fail(&job, &mut run, WorkerError::internal(message))
                    .await;
            }
        }

        run.into_outcome(job.job_id)
    }

    async fn drive(&self, job: &JobDescriptor, run: &mut JobRun) {
        match self.execute(job, run).await {
            Ok(payload) => self.complete(job, run, payload).await,
            Err(err) => self.fail(job, run, err).await,
        }
    }

    async fn execute(
        &self,
        job: &JobDescriptor,
        run: &mut JobRun,
    ) -> WorkerResult<CompletionPayload> {
        let config = self.registry.get(job.module).ok_or_else(|| {
            WorkerError::internal(format!("module {} is not registered", job.module))
        })?;
        let params = ModuleParams::parse(job.module, &job.params)?;

        run.advance(JobPhase::PreviewGenerating);
        self.preview(job, config, &params, run).await;

        run.advance(JobPhase::FinalGenerating);
        let result = self
            .generate_phase(config, &params, JobStage::Final)
            .await?;
        if !result.is_deliverable() {
            return Err(WorkerError::NoFinalAssets);
        }

        run.advance(JobPhase::FinalUploading);
        let asset = self
            .uploader
            .upload(
                &result,
                job.module,
                &job.user_id,
                job.job_id.as_str(),
                JobStage::Final,
            )
            .await;
        if asset.is_empty() {
            return Err(WorkerError::NoFinalAssets);
        }

        let file_count = asset.urls.len();
        Ok(CompletionPayload::Completed {
            worker_meta: CompletedMeta {
                module: job.module,
                provider: config.provider.as_str().to_string(),
                model: result.model().to_string(),
                kind: result.kind().to_string(),
                duration: result.duration(),
                tokens_used: result.usage(),
                file_count,
                processing_time_ms: u64::try_from(run.started.elapsed().as_millis())
                    .unwrap_or(u64::MAX),
                completed_at: Utc::now(),
            },
            final_urls: asset.urls,
            generation_type: job.module,
            asset_metadata: AssetSummary {
                preview_generated: run.preview_assets > 0,
                final_generated: true,
                total_assets: run.preview_assets + file_count,
            },
        })
    }

    /// Best-effort preview. Never fails the job.
    async fn preview(
        &self,
        job: &JobDescriptor,
        config: &ModuleConfig,
        params: &ModuleParams,
        run: &mut JobRun,
    ) {
        let result = match self.generate_phase(config, params, JobStage::Preview).await {
            Ok(result) if result.is_deliverable() => result,
            Ok(_) => {
                run.logger
                    .log_warning("preview produced nothing deliverable, skipping");
                return;
            }
            Err(e) => {
                run.logger.log_warning(&format!("preview skipped: {}", e));
                return;
            }
        };

        run.advance(JobPhase::PreviewUploading);
        let asset = self
            .uploader
            .upload(
                &result,
                job.module,
                &job.user_id,
                job.job_id.as_str(),
                JobStage::Preview,
            )
            .await;

        let Some(payload) = PreviewReadyPayload::from_asset(&asset) else {
            run.logger
                .log_warning("no preview assets were uploaded, skipping preview callback");
            return;
        };
        run.preview_assets = asset.urls.len();

        run.advance(JobPhase::PreviewNotified);
        let sent = self
            .notifier
            .notify_preview_ready(job.job_id.as_str(), &payload)
            .await;
        record_callback(run, CallbackRoute::PreviewReady, sent);
    }

    async fn generate_phase(
        &self,
        config: &ModuleConfig,
        params: &ModuleParams,
        stage: JobStage,
    ) -> WorkerResult<GenerationResult> {
        let started = Instant::now();
        let generation = async {
            match stage {
                JobStage::Preview => self.dispatcher.generate_preview(config, params).await,
                JobStage::Final => self.dispatcher.generate_final(config, params).await,
            }
        };
        let result = tokio::time::timeout(self.config.phase_timeout, generation).await;
        metrics::record_phase_duration(stage, config.id, started.elapsed());

        match result {
            Ok(generated) => Ok(generated?),
            Err(_) => Err(WorkerError::PhaseTimeout {
                stage,
                timeout: self.config.phase_timeout,
            }),
        }
    }

    async fn complete(&self, job: &JobDescriptor, run: &mut JobRun, payload: CompletionPayload) {
        run.advance(JobPhase::Completed);
        let sent = self
            .notifier
            .notify_completion(job.job_id.as_str(), &payload)
            .await;
        record_callback(run, CallbackRoute::Completion, sent);

        metrics::record_job_completed(job.module);
        run.logger.log_completion(&format!(
            "{} ms",
            run.started.elapsed().as_millis()
        ));
    }

    async fn fail(&self, job: &JobDescriptor, run: &mut JobRun, err: WorkerError) {
        let error_type = err.error_type();
        run.logger
            .log_error(&format!("{} ({})", err, error_type));
        run.advance(JobPhase::Failed);
        run.error_type = Some(error_type);

        let payload = CompletionPayload::failed(err.to_string(), job.module.as_str(), error_type);
        let sent = self
            .notifier
            .notify_completion(job.job_id.as_str(), &payload)
            .await;
        record_callback(run, CallbackRoute::Completion, sent);

        metrics::record_job_failed(error_type);
    }
}

fn record_callback(run: &mut JobRun, route: CallbackRoute, sent: NotifyResult<()>) {
    let delivered = match sent {
        Ok(()) => true,
        Err(e) => {
            run.logger
                .log_error(&format!("{} callback failed ({}): {}", route, e.error_type(), e));
            metrics::record_callback_failed(route.as_str());
            false
        }
    };
    run.callbacks.push(CallbackAttempt { route, delivered });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
