//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use kinescope_ml_client::MlClientConfig;
use kinescope_pose::config::DEFAULT_PLAY_THROUGH_RATE;
use kinescope_pose::{SamplerConfig, SamplingMode};

/// Kinescope - pose landmark time series from video
#[derive(Parser, Debug)]
#[command(name = "kinescope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build landmark series from a pre-computed detection table (CSV)
    Ingest(IngestArgs),

    /// Sample a video file and run pose detection on every frame
    Extract(ExtractArgs),
}

/// Where and how to write the exported result.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output JSON file (stdout when omitted)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Write single-line JSON
    #[arg(long)]
    pub compact: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Detection table with one row per frame
    pub table: PathBuf,

    /// Expected media duration in seconds, enables coverage validation
    #[arg(short, long)]
    pub duration: Option<f64>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Video file to sample
    pub video: PathBuf,

    /// Frames per second to sample
    #[arg(short, long)]
    pub rate: Option<f64>,

    /// Play the video through instead of seeking to every frame
    #[arg(long)]
    pub play_through: bool,

    /// Playback rate used with --play-through
    #[arg(long, requires = "play_through")]
    pub playback_rate: Option<f64>,

    /// Per-frame detection timeout in milliseconds
    #[arg(long)]
    pub detect_timeout_ms: Option<u64>,

    /// Pose service base URL
    #[arg(long, env = "POSE_SERVICE_URL")]
    pub service_url: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl ExtractArgs {
    /// Apply command-line overrides on top of `base`.
    pub fn sampler_config(&self, base: SamplerConfig) -> SamplerConfig {
        let mut config = base;

        if let Some(rate) = self.rate {
            config.sample_rate = rate;
        }
        if let Some(ms) = self.detect_timeout_ms {
            config.detect_timeout = Duration::from_millis(ms);
        }
        if self.play_through {
            let playback_rate = self.playback_rate.unwrap_or(match config.mode {
                SamplingMode::PlayThrough { playback_rate } => playback_rate,
                SamplingMode::Sequential => DEFAULT_PLAY_THROUGH_RATE,
            });
            config.mode = SamplingMode::PlayThrough { playback_rate };
        }

        config
    }

    pub fn client_config(&self, base: MlClientConfig) -> MlClientConfig {
        match &self.service_url {
            Some(url) => MlClientConfig {
                base_url: url.clone(),
                ..base
            },
            None => base,
        }
    }
}
