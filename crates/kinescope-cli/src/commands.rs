//! Subcommand implementations.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use kinescope_ml_client::{HttpPoseDetector, MlClientConfig, PoseClient};
use kinescope_pose::progress;
use kinescope_pose::{
    FfmpegMediaSource, FrameSampler, IngestConfig, ProcessingResult, ProgressEvent, ProgressReceiver,
    ResultExporter, SamplerConfig, TableIngestor,
};

use crate::cli::{ExtractArgs, IngestArgs, OutputArgs};

pub async fn ingest(args: IngestArgs) -> Result<()> {
    let text = tokio::fs::read_to_string(&args.table)
        .await
        .with_context(|| format!("failed to read {}", args.table.display()))?;

    let ingestor = TableIngestor::new(IngestConfig::from_env());
    let outcome = ingestor
        .ingest_str(&text, args.duration)
        .with_context(|| format!("failed to ingest {}", args.table.display()))?;

    if !outcome.missing_landmarks.is_empty() {
        warn!(
            missing = outcome.missing_landmarks.len(),
            "Table lacks columns for some landmarks"
        );
    }
    if let Some(report) = &outcome.validation {
        if !report.is_valid {
            warn!(
                warnings = report.warnings.len(),
                "Pose data does not cover the expected duration"
            );
        }
    }
    info!(
        rows = outcome.rows_total,
        skipped = outcome.rows_skipped,
        "Table ingested"
    );

    write_result(&outcome.result, &args.output).await
}

pub async fn extract(args: ExtractArgs) -> Result<()> {
    let config = args.sampler_config(SamplerConfig::from_env());
    let client = PoseClient::new(args.client_config(MlClientConfig::from_env()))
        .context("failed to create pose service client")?;

    let mut media = FfmpegMediaSource::open(&args.video)
        .await
        .with_context(|| format!("failed to open {}", args.video.display()))?;

    let (sender, receiver) = progress::channel();
    let sampler = Arc::new(
        FrameSampler::new(Arc::new(HttpPoseDetector::new(client)), config).with_progress(sender),
    );

    let reporter = tokio::spawn(report_progress(receiver));
    let interrupt = {
        let sampler = Arc::clone(&sampler);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() && sampler.cancel() {
                warn!("Interrupted, cancelling sampling");
            }
        })
    };

    let outcome = sampler.process_detailed(&mut media).await;

    // Release every progress sender so the reporter drains and exits.
    interrupt.abort();
    let _ = interrupt.await;
    drop(sampler);
    let _ = reporter.await;

    let outcome = outcome.with_context(|| format!("failed to sample {}", args.video.display()))?;
    write_result(&outcome.result, &args.output).await
}

async fn report_progress(mut receiver: ProgressReceiver) {
    while let Some(event) = receiver.recv().await {
        match event {
            ProgressEvent::Started { total_frames } => info!(total_frames, "Sampling started"),
            ProgressEvent::Frame { frame_index, progress } => {
                debug!(frame = frame_index, progress, "Frame sampled")
            }
            ProgressEvent::FrameMissed { frame_index, reason } => {
                debug!(frame = frame_index, reason = ?reason, "Frame missed")
            }
            ProgressEvent::Completed { summary } => info!(
                frames = summary.frames_total,
                with_pose = summary.frames_with_pose,
                timed_out = summary.frames_timed_out,
                failed = summary.frames_failed,
                missed = summary.frames_missed,
                "Sampling summary"
            ),
            ProgressEvent::Cancelled { progress } => warn!(progress, "Sampling cancelled"),
            ProgressEvent::Failed { error } => warn!(error = %error, "Sampling failed"),
        }
    }
}

async fn write_result(result: &ProcessingResult, output: &OutputArgs) -> Result<()> {
    let exporter = if output.compact {
        ResultExporter::compact()
    } else {
        ResultExporter::pretty()
    };

    match &output.out {
        Some(path) => exporter
            .write_to_file(result, path)
            .await
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let json = exporter.to_json(result).context("failed to serialize result")?;
            println!("{}", json);
            Ok(())
        }
    }
}
