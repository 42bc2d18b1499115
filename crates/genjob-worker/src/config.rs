//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Upper bound on each generation phase (preview, final), including
    /// any time spent waiting in an upstream provider queue
    pub phase_timeout: Duration,
    /// Maximum jobs running their pipeline at once; later jobs wait for a slot
    pub max_concurrent_jobs: usize,
    /// How long shutdown waits for in-flight jobs to send their callbacks
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            phase_timeout: Duration::from_secs(600), // 10 minutes
            max_concurrent_jobs: 16,
            shutdown_timeout: Duration::from_secs(1260), // both phases plus uploads
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let phase_timeout = Duration::from_secs(
            std::env::var("WORKER_PHASE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(600),
        );

        Self {
            phase_timeout,
            max_concurrent_jobs: std::env::var("WORKER_MAX_CONCURRENT_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(16),
            shutdown_timeout: std::env::var("WORKER_SHUTDOWN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(phase_timeout * 2 + Duration::from_secs(60)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shutdown_outlasts_both_phases() {
        let config = WorkerConfig::default();
        assert!(config.max_concurrent_jobs > 0);
        assert!(config.shutdown_timeout > config.phase_timeout * 2);
    }
}
