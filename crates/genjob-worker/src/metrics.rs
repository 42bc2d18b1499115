//! Job pipeline metrics.

use std::time::Duration;

use metrics::{counter, histogram};

use genjob_models::{JobStage, ModuleId};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_ACCEPTED_TOTAL: &str = "genjob_jobs_accepted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "genjob_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "genjob_jobs_failed_total";
    pub const CALLBACKS_FAILED_TOTAL: &str = "genjob_callbacks_failed_total";
    pub const PHASE_DURATION_SECONDS: &str = "genjob_phase_duration_seconds";
}

pub fn record_job_accepted(module: ModuleId) {
    let labels = [("module", module.as_str().to_string())];
    counter!(names::JOBS_ACCEPTED_TOTAL, &labels).increment(1);
}

pub fn record_job_completed(module: ModuleId) {
    let labels = [("module", module.as_str().to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}

pub fn record_job_failed(error_type: &str) {
    let labels = [("error_type", error_type.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_callback_failed(route: &str) {
    let labels = [("route", route.to_string())];
    counter!(names::CALLBACKS_FAILED_TOTAL, &labels).increment(1);
}

/// Wall time of one generation phase, including provider queue time.
pub fn record_phase_duration(stage: JobStage, module: ModuleId, elapsed: Duration) {
    let labels = [
        ("stage", stage.as_str().to_string()),
        ("module", module.as_str().to_string()),
    ];
    histogram!(names::PHASE_DURATION_SECONDS, &labels).record(elapsed.as_secs_f64());
}
