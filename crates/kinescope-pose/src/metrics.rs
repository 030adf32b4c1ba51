//! Acquisition metrics.
//!
//! Counters and histograms for ingestion and live sampling:
//! - Rows and samples per ingestion
//! - Frame outcomes per sampling run
//! - Run and detection latency

use std::time::Duration;

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Table rows seen by status (`accepted`, `skipped`).
    pub const INGEST_ROWS_TOTAL: &str = "kinescope_ingest_rows_total";

    /// Samples stored by ingestion.
    pub const INGEST_SAMPLES_TOTAL: &str = "kinescope_ingest_samples_total";

    /// Ingestion latency in seconds.
    pub const INGEST_DURATION_SECONDS: &str = "kinescope_ingest_duration_seconds";

    /// Sampled frames by outcome (`pose`, `empty`, `timeout`, `failed`, `missed`).
    pub const FRAMES_TOTAL: &str = "kinescope_frames_total";

    /// Detection latency in seconds.
    pub const DETECT_SECONDS: &str = "kinescope_detect_seconds";

    /// Sampling runs by status (`completed`, `cancelled`, `failed`).
    pub const RUNS_TOTAL: &str = "kinescope_runs_total";

    /// Sampling run latency in seconds.
    pub const RUN_DURATION_SECONDS: &str = "kinescope_run_duration_seconds";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record a finished ingestion.
pub fn record_ingestion(rows: usize, skipped: usize, samples: usize, elapsed: Duration) {
    counter!(names::INGEST_ROWS_TOTAL, "status" => "accepted")
        .increment(rows.saturating_sub(skipped) as u64);
    counter!(names::INGEST_ROWS_TOTAL, "status" => "skipped").increment(skipped as u64);
    counter!(names::INGEST_SAMPLES_TOTAL).increment(samples as u64);
    histogram!(names::INGEST_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

/// Record the outcome of one sampled frame.
pub fn record_frame(outcome: &'static str) {
    counter!(names::FRAMES_TOTAL, "outcome" => outcome).increment(1);
}

/// Record how long one detection took.
pub fn record_detection(elapsed: Duration) {
    histogram!(names::DETECT_SECONDS).record(elapsed.as_secs_f64());
}

/// Record a finished sampling run.
pub fn record_run(status: &'static str, elapsed: Duration) {
    counter!(names::RUNS_TOTAL, "status" => status).increment(1);
    histogram!(names::RUN_DURATION_SECONDS, "status" => status).record(elapsed.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================
