//! Live frame sampling.
//!
//! Drives a [`PoseDetector`] frame by frame over a [`MediaSource`]:
//! seek, capture into the shared buffer, detect with a bounded wait, store
//! the landmarks. Per-frame failures become gaps in the series; only
//! detector initialization and unrecoverable media errors fail a run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, OnceCell};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

use kinescope_models::ProcessingResult;

use crate::composite::CompositeJointDeriver;
use crate::config::{SamplerConfig, SamplingMode};
use crate::detector::{LandmarkObservation, PoseDetector};
use crate::error::{PoseError, PoseResult};
use crate::media::{FrameBuffer, MediaSource, ReadyState};
use crate::metrics;
use crate::progress::{MissReason, ProgressSender, RunSummary};
use crate::store::TimeSeriesStore;

#[cfg(test)]
mod tests;

/// Lower bound on the playback polling interval in play-through mode.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Where a sampler is in its run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplerState {
    Idle,
    Initializing,
    Seeking { frame: usize },
    AwaitingCapture { frame: usize },
    Submitting { frame: usize },
    AwaitingDetection { frame: usize },
    Completed,
    Cancelled,
    Failed,
}

impl SamplerState {
    /// Whether a run currently owns the sampler.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SamplerState::Initializing
                | SamplerState::Seeking { .. }
                | SamplerState::AwaitingCapture { .. }
                | SamplerState::Submitting { .. }
                | SamplerState::AwaitingDetection { .. }
        )
    }
}

/// Result of a completed run together with its counters.
#[derive(Debug, Clone)]
pub struct SamplingOutcome {
    pub result: ProcessingResult,
    pub summary: RunSummary,
}

/// Mutable bookkeeping of one run.
struct Run {
    store: TimeSeriesStore,
    summary: RunSummary,
    total: usize,
    progress: f64,
}

/// Marks the state cancelled if a run future is dropped mid-flight.
///
/// Emits the `Cancelled` progress event the run could not send. Playback is
/// not restored since that needs the media, which the dropped future owned.
struct RunGuard<'a> {
    sampler: &'a FrameSampler,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let abandoned = self.sampler.state.send_if_modified(|state| {
            if state.is_active() {
                *state = SamplerState::Cancelled;
                true
            } else {
                false
            }
        });

        if abandoned {
            warn!("Sampling run dropped before finishing, media left paused");
            if let Some(progress) = &self.sampler.progress {
                progress.cancelled(self.sampler.last_progress());
            }
        }
    }
}

/// Extracts landmark series from media by running a detector on sampled frames.
///
/// One run at a time per instance; a second concurrent `process` call fails
/// with [`PoseError::Busy`]. Share the sampler through an `Arc` to cancel a
/// run from another task.
pub struct FrameSampler {
    detector: Arc<dyn PoseDetector>,
    config: SamplerConfig,
    composites: CompositeJointDeriver,
    initialized: OnceCell<()>,
    state: watch::Sender<SamplerState>,
    cancel: watch::Sender<bool>,
    buffer: Mutex<FrameBuffer>,
    progress: Option<ProgressSender>,
    /// Progress of the current run as `f64` bits
    run_progress: AtomicU64,
}

impl FrameSampler {
    pub fn new(detector: Arc<dyn PoseDetector>, config: SamplerConfig) -> Self {
        let (state, _) = watch::channel(SamplerState::Idle);
        let (cancel, _) = watch::channel(false);

        Self {
            detector,
            config,
            composites: CompositeJointDeriver::default(),
            initialized: OnceCell::new(),
            state,
            cancel,
            buffer: Mutex::new(FrameBuffer::new()),
            progress: None,
            run_progress: AtomicU64::new(0),
        }
    }

    /// Report progress through `sender`.
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Replace the composite joints added to results.
    pub fn with_composites(mut self, composites: CompositeJointDeriver) -> Self {
        self.composites = composites;
        self
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn state(&self) -> SamplerState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SamplerState> {
        self.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    /// Request cancellation of the active run.
    ///
    /// The run stops at the next frame boundary; a detection already in
    /// flight settles first and its result is discarded. Returns whether a
    /// run was active.
    pub fn cancel(&self) -> bool {
        let active = self.is_running();
        if active {
            info!("Cancellation requested");
            self.cancel.send_replace(true);
        }
        active
    }

    /// Initialize the detector once.
    ///
    /// Concurrent callers share one initialization; a failed attempt leaves
    /// the sampler uninitialized so a later call tries again.
    pub async fn initialize(&self) -> PoseResult<()> {
        self.initialized
            .get_or_try_init(|| async {
                info!(detector = self.detector.name(), "Initializing pose detector");
                self.detector.initialize().await.map_err(|err| match err {
                    PoseError::Initialization(_) => err,
                    other => PoseError::initialization(other.to_string()),
                })
            })
            .await?;
        Ok(())
    }

    /// Sample `media` and return the populated result.
    pub async fn process<M>(&self, media: &mut M) -> PoseResult<ProcessingResult>
    where
        M: MediaSource + ?Sized,
    {
        self.process_detailed(media).await.map(|outcome| outcome.result)
    }

    /// Sample `media` and return the result with run counters.
    ///
    /// Playback is restored on every outcome except a dropped future, which
    /// leaves the media paused; use [`FrameSampler::cancel`] to stop a run.
    pub async fn process_detailed<M>(&self, media: &mut M) -> PoseResult<SamplingOutcome>
    where
        M: MediaSource + ?Sized,
    {
        self.config.validate()?;
        self.claim()?;
        let _guard = RunGuard { sampler: self };

        let started = Instant::now();
        let outcome = self.run(media).await;
        let elapsed = started.elapsed();

        match &outcome {
            Ok(outcome) => {
                self.set_state(SamplerState::Completed);
                metrics::record_run("completed", elapsed);
                info!(
                    frames = outcome.summary.frames_total,
                    with_pose = outcome.summary.frames_with_pose,
                    gaps = outcome.summary.gaps(),
                    samples = outcome.summary.samples,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Sampling completed"
                );
                if let Some(progress) = &self.progress {
                    progress.completed(outcome.summary.clone());
                }
            }
            Err(PoseError::Cancelled) => {
                self.set_state(SamplerState::Cancelled);
                metrics::record_run("cancelled", elapsed);
                info!(elapsed_ms = elapsed.as_millis() as u64, "Sampling cancelled");
            }
            Err(err) => {
                self.set_state(SamplerState::Failed);
                metrics::record_run("failed", elapsed);
                error!(error = %err, "Sampling failed");
                if let Some(progress) = &self.progress {
                    progress.failed(err.to_string());
                }
            }
        }

        outcome
    }

    /// Take ownership of the sampler for a run.
    ///
    /// The cancel flag is cleared under the state lock, so a `cancel()` that
    /// observes the new run is never overwritten.
    fn last_progress(&self) -> f64 {
        f64::from_bits(self.run_progress.load(Ordering::Relaxed))
    }

    fn claim(&self) -> PoseResult<()> {
        let claimed = self.state.send_if_modified(|state| {
            if state.is_active() {
                false
            } else {
                self.cancel.send_replace(false);
                self.run_progress.store(0f64.to_bits(), Ordering::Relaxed);
                *state = SamplerState::Initializing;
                true
            }
        });

        if claimed {
            Ok(())
        } else {
            Err(PoseError::Busy)
        }
    }

    async fn run<M>(&self, media: &mut M) -> PoseResult<SamplingOutcome>
    where
        M: MediaSource + ?Sized,
    {
        self.initialize().await?;
        self.wait_ready(media).await?;

        let duration = media.duration();
        let total = self.config.frame_count(duration);
        info!(
            detector = self.detector.name(),
            media = media.name(),
            duration,
            frames = total,
            sample_rate = self.config.sample_rate,
            mode = ?self.config.mode,
            "Starting frame sampling"
        );

        let was_playing = media.is_playing();
        media.pause().await?;

        let mut run = Run {
            store: TimeSeriesStore::with_min_visibility(self.config.min_visibility),
            summary: RunSummary {
                frames_total: total,
                ..Default::default()
            },
            total,
            progress: 0.0,
        };
        if let Some(progress) = &self.progress {
            progress.started(total);
        }

        let sampled = match self.config.mode {
            SamplingMode::Sequential => self.sample_sequential(media, &mut run).await,
            SamplingMode::PlayThrough { playback_rate } => {
                self.sample_play_through(media, &mut run, playback_rate).await
            }
        };

        self.restore_playback(media, was_playing).await;

        if let Err(PoseError::Cancelled) = &sampled {
            if let Some(progress) = &self.progress {
                progress.cancelled(run.progress);
            }
        }
        sampled?;

        run.summary.samples = run.store.sample_count();
        let mut joints = run.store.freeze();
        self.composites.augment(&mut joints);

        Ok(SamplingOutcome {
            result: ProcessingResult::completed(joints),
            summary: run.summary,
        })
    }

    async fn wait_ready<M>(&self, media: &mut M) -> PoseResult<()>
    where
        M: MediaSource + ?Sized,
    {
        if media.ready_state() >= ReadyState::CanPlay {
            return Ok(());
        }

        debug!(state = ?media.ready_state(), "Waiting for media to become playable");
        match timeout(self.config.ready_timeout, media.wait_ready()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) if err.is_recoverable() => {
                warn!(error = %err, "Media readiness check failed, proceeding anyway");
                Ok(())
            }
            Ok(Err(err)) => Err(err.into()),
            Err(_) => {
                warn!(
                    timeout_ms = self.config.ready_timeout.as_millis() as u64,
                    "Media load timeout, proceeding anyway"
                );
                Ok(())
            }
        }
    }

    async fn sample_sequential<M>(&self, media: &mut M, run: &mut Run) -> PoseResult<()>
    where
        M: MediaSource + ?Sized,
    {
        for frame_index in 0..run.total {
            if self.is_cancelled() {
                return Err(PoseError::Cancelled);
            }

            let target_t = self.config.target_time(frame_index);
            self.seek(media, target_t, frame_index).await;
            self.sample_frame(media, run, frame_index, target_t).await?;
            self.frame_yield().await;
        }
        Ok(())
    }

    async fn sample_play_through<M>(
        &self,
        media: &mut M,
        run: &mut Run,
        playback_rate: f64,
    ) -> PoseResult<()>
    where
        M: MediaSource + ?Sized,
    {
        let interval = 1.0 / self.config.sample_rate;
        let poll = Duration::from_secs_f64(interval / playback_rate / 4.0).max(MIN_POLL_INTERVAL);

        self.seek(media, 0.0, 0).await;
        media.set_playback_rate(playback_rate);
        media.play().await?;

        let mut last_processed = f64::NEG_INFINITY;

        for frame_index in 0..run.total {
            let expected = self.config.target_time(frame_index);
            self.set_state(SamplerState::Seeking { frame: frame_index });

            let position = loop {
                if self.is_cancelled() {
                    return Err(PoseError::Cancelled);
                }

                let position = media.position();
                if position >= expected && position > last_processed + interval * 0.5 {
                    break position;
                }

                if media.has_ended() || !media.is_playing() {
                    warn!(
                        frame = frame_index,
                        position,
                        remaining = run.total - frame_index,
                        "Playback stopped before all frames were sampled"
                    );
                    for missed in frame_index..run.total {
                        self.frame_missed(run, missed, MissReason::PlaybackEnded);
                        self.frame_done(run, missed);
                    }
                    return Ok(());
                }

                sleep(poll).await;
            };

            last_processed = position;
            self.sample_frame(media, run, frame_index, position).await?;
            self.frame_yield().await;
        }
        Ok(())
    }

    /// Seek and wait for it to settle, best effort.
    async fn seek<M>(&self, media: &mut M, target_t: f64, frame_index: usize)
    where
        M: MediaSource + ?Sized,
    {
        self.set_state(SamplerState::Seeking { frame: frame_index });

        match timeout(self.config.seek_timeout, media.seek(target_t)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(frame = frame_index, target_t, error = %err, "Seek failed, capturing current frame");
            }
            Err(_) => {
                warn!(frame = frame_index, target_t, "Seek did not settle in time, proceeding");
            }
        }
    }

    /// Capture, detect and store one frame stamped at `t`.
    async fn sample_frame<M>(
        &self,
        media: &mut M,
        run: &mut Run,
        frame_index: usize,
        t: f64,
    ) -> PoseResult<()>
    where
        M: MediaSource + ?Sized,
    {
        self.set_state(SamplerState::AwaitingCapture { frame: frame_index });
        let mut buffer = self.buffer.lock().await;

        if let Err(err) = media.capture(&mut *buffer).await {
            if !err.is_recoverable() {
                return Err(err.into());
            }
            warn!(frame = frame_index, target_t = t, error = %err, "Frame capture failed, skipping frame");
            drop(buffer);
            self.frame_missed(run, frame_index, MissReason::CaptureFailed);
            self.frame_done(run, frame_index);
            return Ok(());
        }

        self.set_state(SamplerState::Submitting { frame: frame_index });
        let detection = self.detector.detect(&*buffer);

        self.set_state(SamplerState::AwaitingDetection { frame: frame_index });
        let started = Instant::now();
        let outcome = timeout(self.config.detect_timeout, detection).await;
        metrics::record_detection(started.elapsed());
        drop(buffer);

        if self.is_cancelled() {
            debug!(frame = frame_index, "Discarding detection after cancellation");
            return Err(PoseError::Cancelled);
        }

        match outcome {
            Ok(Ok(observations)) => self.record(run, frame_index, t, &observations),
            Ok(Err(err)) => {
                warn!(frame = frame_index, target_t = t, error = %err, "Detection failed, skipping frame");
                self.frame_missed(run, frame_index, MissReason::DetectFailed);
            }
            Err(_) => {
                let err = PoseError::PerFrameTimeout {
                    frame: frame_index,
                    timeout_ms: self.config.detect_timeout.as_millis() as u64,
                };
                warn!(frame = frame_index, target_t = t, error = %err, "Detection timeout");
                self.frame_missed(run, frame_index, MissReason::DetectTimeout);
            }
        }

        self.frame_done(run, frame_index);
        Ok(())
    }

    fn record(&self, run: &mut Run, frame_index: usize, t: f64, observations: &[LandmarkObservation]) {
        if observations.is_empty() {
            run.summary.frames_empty += 1;
            metrics::record_frame("empty");
            debug!(frame = frame_index, target_t = t, "No pose in frame");
            return;
        }

        run.summary.frames_with_pose += 1;
        metrics::record_frame("pose");

        let mut stored = 0;
        for observation in observations {
            match observation.landmark() {
                Ok(landmark) => {
                    if run.store.append(landmark, observation.to_sample(t)) {
                        stored += 1;
                    }
                }
                Err(err) => debug!(frame = frame_index, error = %err, "Ignoring observation"),
            }
        }
        debug!(frame = frame_index, target_t = t, stored, "Frame sampled");
    }

    fn frame_missed(&self, run: &mut Run, frame_index: usize, reason: MissReason) {
        run.summary.record_miss(reason);
        metrics::record_frame(match reason {
            MissReason::DetectTimeout => "timeout",
            MissReason::DetectFailed | MissReason::CaptureFailed => "failed",
            MissReason::PlaybackEnded => "missed",
        });
        if let Some(progress) = &self.progress {
            progress.frame_missed(frame_index, reason);
        }
    }

    fn frame_done(&self, run: &mut Run, frame_index: usize) {
        run.progress = (frame_index + 1) as f64 / run.total as f64;
        self.run_progress.store(run.progress.to_bits(), Ordering::Relaxed);
        if let Some(progress) = &self.progress {
            progress.frame(frame_index, run.progress);
        }
    }

    async fn restore_playback<M>(&self, media: &mut M, was_playing: bool)
    where
        M: MediaSource + ?Sized,
    {
        if let Err(err) = media.pause().await {
            warn!(error = %err, "Failed to pause media after sampling");
        }
        if was_playing {
            if let Err(err) = media.play().await {
                warn!(error = %err, "Failed to resume playback");
            }
        }
    }

    async fn frame_yield(&self) {
        if self.config.frame_yield.is_zero() {
            tokio::task::yield_now().await;
        } else {
            sleep(self.config.frame_yield).await;
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    fn set_state(&self, state: SamplerState) {
        self.state.send_replace(state);
    }
}
