//! Configuration for table ingestion and live frame sampling.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use kinescope_models::DEFAULT_VISIBILITY_THRESHOLD;

use crate::error::{PoseError, PoseResult};

/// How the sampler walks through the media.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// Seek to every target time; samples are stamped with the target time.
    Sequential,
    /// Play the media at a reduced rate and sample as playback passes each
    /// target time; samples are stamped with the observed position.
    PlayThrough { playback_rate: f64 },
}

impl Default for SamplingMode {
    fn default() -> Self {
        Self::Sequential
    }
}

/// Configuration for the live frame sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Frames per second to sample (default: 30.0)
    pub sample_rate: f64,

    /// Bound on waiting for a seek to settle (default: 500ms)
    pub seek_timeout: Duration,

    /// Bound on waiting for one detection result (default: 1s)
    pub detect_timeout: Duration,

    /// Bound on waiting for the media to become playable (default: 5s)
    pub ready_timeout: Duration,

    /// Pause between frames so the host scheduler is not starved (default: 1ms)
    pub frame_yield: Duration,

    /// Visibility a reported confidence must exceed (default: 0.5)
    pub min_visibility: f64,

    /// Sampling mode
    pub mode: SamplingMode,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            seek_timeout: Duration::from_millis(500),
            detect_timeout: Duration::from_millis(1000),
            ready_timeout: Duration::from_secs(5),
            frame_yield: Duration::from_millis(1),
            min_visibility: DEFAULT_VISIBILITY_THRESHOLD,
            mode: SamplingMode::Sequential,
        }
    }
}

/// Default playback rate for play-through sampling.
pub const DEFAULT_PLAY_THROUGH_RATE: f64 = 0.25;

impl SamplerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let play_through = env_parse("KINESCOPE_PLAY_THROUGH").unwrap_or(false);

        Self {
            sample_rate: env_parse("KINESCOPE_SAMPLE_RATE").unwrap_or(defaults.sample_rate),
            seek_timeout: env_millis("KINESCOPE_SEEK_TIMEOUT_MS").unwrap_or(defaults.seek_timeout),
            detect_timeout: env_millis("KINESCOPE_DETECT_TIMEOUT_MS")
                .unwrap_or(defaults.detect_timeout),
            ready_timeout: env_millis("KINESCOPE_READY_TIMEOUT_MS")
                .unwrap_or(defaults.ready_timeout),
            frame_yield: env_millis("KINESCOPE_FRAME_YIELD_MS").unwrap_or(defaults.frame_yield),
            min_visibility: env_parse("KINESCOPE_MIN_VISIBILITY")
                .unwrap_or(defaults.min_visibility),
            mode: if play_through {
                SamplingMode::PlayThrough {
                    playback_rate: env_parse("KINESCOPE_PLAYBACK_RATE")
                        .unwrap_or(DEFAULT_PLAY_THROUGH_RATE),
                }
            } else {
                SamplingMode::Sequential
            },
        }
    }

    /// Reject values the sampler cannot run with.
    pub fn validate(&self) -> PoseResult<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(PoseError::invalid_config(format!(
                "sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if let SamplingMode::PlayThrough { playback_rate } = self.mode {
            if !(playback_rate.is_finite() && playback_rate > 0.0) {
                return Err(PoseError::invalid_config(format!(
                    "playback_rate must be positive, got {}",
                    playback_rate
                )));
            }
        }
        Ok(())
    }

    /// Number of frames sampled from media of the given duration.
    pub fn frame_count(&self, duration: f64) -> usize {
        if !duration.is_finite() || duration <= 0.0 {
            return 0;
        }
        (duration * self.sample_rate).floor() as usize
    }

    /// Target time of a frame index in seconds.
    pub fn target_time(&self, frame_index: usize) -> f64 {
        frame_index as f64 / self.sample_rate
    }
}

/// Configuration for tabular detection imports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Name of the time column (default: "frame_time_ms")
    pub time_column: String,

    /// Prefix of per-landmark columns, `{prefix}_{index}_{x|y|z|visibility}` (default: "pose")
    pub column_prefix: String,

    /// Raw time units per second; times are divided by this (default: 1000.0)
    pub time_units_per_second: f64,

    /// Visibility a row must exceed to be kept (default: 0.5)
    pub min_visibility: f64,

    /// Allowed relative deviation between data span and media duration (default: 0.10)
    pub duration_tolerance: f64,

    /// Slack in seconds before a late start or early end is reported (default: 0.5)
    pub edge_slack_secs: f64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            time_column: "frame_time_ms".to_string(),
            column_prefix: "pose".to_string(),
            time_units_per_second: 1000.0,
            min_visibility: DEFAULT_VISIBILITY_THRESHOLD,
            duration_tolerance: 0.10,
            edge_slack_secs: 0.5,
        }
    }
}

impl IngestConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            time_column: std::env::var("KINESCOPE_TIME_COLUMN").unwrap_or(defaults.time_column),
            column_prefix: std::env::var("KINESCOPE_COLUMN_PREFIX")
                .unwrap_or(defaults.column_prefix),
            time_units_per_second: env_parse("KINESCOPE_TIME_UNITS_PER_SECOND")
                .unwrap_or(defaults.time_units_per_second),
            min_visibility: env_parse("KINESCOPE_MIN_VISIBILITY")
                .unwrap_or(defaults.min_visibility),
            duration_tolerance: env_parse("KINESCOPE_DURATION_TOLERANCE")
                .unwrap_or(defaults.duration_tolerance),
            edge_slack_secs: env_parse("KINESCOPE_EDGE_SLACK_SECS")
                .unwrap_or(defaults.edge_slack_secs),
        }
    }

    /// Column name for one landmark coordinate.
    pub fn landmark_column(&self, index: usize, field: &str) -> String {
        format!("{}_{}_{}", self.column_prefix, index, field)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}
