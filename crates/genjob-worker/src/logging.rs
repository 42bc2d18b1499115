//! Structured job logging utilities.
//!
//! Every line carries the job id and module so a single job can be followed
//! through preview, final and callbacks.

use tracing::{error, info, warn, Span};

use genjob_models::{JobId, JobPhase, ModuleId};

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    module: ModuleId,
}

impl JobLogger {
    pub fn new(job_id: &JobId, module: ModuleId) -> Self {
        Self {
            job_id: job_id.to_string(),
            module,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            module = %self.module,
            "Job started: {}", message
        );
    }

    /// Log a phase transition.
    pub fn log_phase(&self, phase: JobPhase) {
        info!(
            job_id = %self.job_id,
            module = %self.module,
            phase = phase.as_str(),
            "Job phase: {}", phase
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            module = %self.module,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            module = %self.module,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            module = %self.module,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span the detached job task is instrumented with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            module = %self.module
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let job_id = JobId::from("job-123");
        let logger = JobLogger::new(&job_id, ModuleId::Speech);

        assert_eq!(logger.job_id(), "job-123");
        assert_eq!(logger.module, ModuleId::Speech);
    }
}
