use super::*;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

use kinescope_models::{BodyLandmark, DerivedJoint};

use crate::error::{MediaError, MediaResult};
use crate::progress::{self, ProgressEvent};

const RATE: f64 = 10.0;

/// In-memory media: seeks settle instantly, captures stamp the position.
struct ScriptedMedia {
    duration: f64,
    position: f64,
    ready: ReadyState,
    rate: f64,
    clock: Option<(Instant, f64)>,
    /// Playback stops here (defaults to `duration`)
    playable_until: f64,
    playing_at_start: bool,
    captures: usize,
    not_ready_captures: Vec<usize>,
    fatal_capture: Option<usize>,
    seeks: usize,
    hanging_seeks: Vec<usize>,
    pauses: usize,
}

impl ScriptedMedia {
    fn new(duration: f64) -> Self {
        Self {
            duration,
            position: 0.0,
            ready: ReadyState::CanPlay,
            rate: 1.0,
            clock: None,
            playable_until: duration,
            playing_at_start: false,
            captures: 0,
            not_ready_captures: Vec::new(),
            fatal_capture: None,
            seeks: 0,
            hanging_seeks: Vec::new(),
            pauses: 0,
        }
    }

    fn playing(mut self) -> Self {
        self.playing_at_start = true;
        self.clock = Some((Instant::now(), 0.0));
        self
    }
}

#[async_trait]
impl MediaSource for ScriptedMedia {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn ready_state(&self) -> ReadyState {
        self.ready
    }

    async fn wait_ready(&mut self) -> MediaResult<()> {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn seek(&mut self, t: f64) -> MediaResult<()> {
        let call = self.seeks;
        self.seeks += 1;
        if self.hanging_seeks.contains(&call) {
            std::future::pending::<()>().await;
        }
        self.position = t.clamp(0.0, self.duration);
        if self.clock.is_some() {
            self.clock = Some((Instant::now(), self.position));
        }
        Ok(())
    }

    fn position(&self) -> f64 {
        match self.clock {
            Some((started, from)) => {
                (from + started.elapsed().as_secs_f64() * self.rate).min(self.playable_until)
            }
            None => self.position,
        }
    }

    async fn capture(&mut self, buffer: &mut FrameBuffer) -> MediaResult<()> {
        let call = self.captures;
        self.captures += 1;
        if self.fatal_capture == Some(call) {
            return Err(MediaError::InvalidVideo("decoder lost".to_string()));
        }
        if self.not_ready_captures.contains(&call) {
            return Err(MediaError::NotReady);
        }
        let position = self.position();
        buffer.fill(2, 2, crate::media::FrameFormat::Rgb8, position, &[0u8; 12]);
        Ok(())
    }

    async fn play(&mut self) -> MediaResult<()> {
        if self.clock.is_none() {
            self.clock = Some((Instant::now(), self.position));
        }
        Ok(())
    }

    async fn pause(&mut self) -> MediaResult<()> {
        self.pauses += 1;
        self.position = self.position();
        self.clock = None;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.clock.is_some() && self.position() < self.playable_until
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.position = self.position();
        if self.clock.is_some() {
            self.clock = Some((Instant::now(), self.position));
        }
        self.rate = rate;
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Detector returning fixed hip and wrist landmarks, with scripted failures
/// keyed by frame index (`round(timestamp * RATE)`).
#[derive(Default)]
struct ScriptedDetector {
    init_calls: AtomicUsize,
    failing_inits: usize,
    detect_calls: AtomicUsize,
    hanging: Vec<usize>,
    failing: Vec<usize>,
    empty: Vec<usize>,
    gate: Option<(usize, Arc<Notify>)>,
}

impl ScriptedDetector {
    fn frame_index(frame: &FrameBuffer) -> usize {
        (frame.timestamp * RATE).round() as usize
    }
}

#[async_trait]
impl PoseDetector for ScriptedDetector {
    async fn initialize(&self) -> PoseResult<()> {
        let call = self.init_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failing_inits {
            return Err(PoseError::detector("model download failed"));
        }
        Ok(())
    }

    async fn detect(&self, frame: &FrameBuffer) -> PoseResult<Vec<LandmarkObservation>> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        let index = Self::frame_index(frame);

        if let Some((gated, notify)) = &self.gate {
            if *gated == index {
                notify.notified().await;
            }
        }
        if self.hanging.contains(&index) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(&index) {
            return Err(PoseError::detector("inference error"));
        }
        if self.empty.contains(&index) {
            return Ok(Vec::new());
        }

        Ok(vec![
            LandmarkObservation::new(0, 0.5, 0.1, 0.0).with_visibility(0.2),
            LandmarkObservation::new(15, 0.3, 0.6, 0.0).with_visibility(0.9),
            LandmarkObservation::new(23, 0.4, 0.3, -0.1).with_visibility(0.9),
            LandmarkObservation::new(24, 0.6, 0.3, 0.1).with_visibility(0.9),
            LandmarkObservation::new(40, 0.5, 0.5, 0.0),
        ])
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn config() -> SamplerConfig {
    SamplerConfig {
        sample_rate: RATE,
        ..Default::default()
    }
}

fn sampler(detector: ScriptedDetector) -> FrameSampler {
    FrameSampler::new(Arc::new(detector), config())
}

fn times(result: &ProcessingResult, landmark: BodyLandmark) -> Vec<f64> {
    result
        .landmark(landmark)
        .map(|series| series.samples.iter().map(|s| s.t).collect())
        .unwrap_or_default()
}

#[tokio::test(start_paused = true)]
async fn test_sequential_run() {
    let sampler = sampler(ScriptedDetector::default());
    let mut media = ScriptedMedia::new(1.05);

    let outcome = sampler.process_detailed(&mut media).await.unwrap();
    let result = &outcome.result;

    assert!(result.complete);
    assert_eq!(result.progress, 1.0);
    assert_eq!(sampler.state(), SamplerState::Completed);

    let expected: Vec<f64> = (0..10).map(|i| i as f64 / RATE).collect();
    assert_eq!(times(result, BodyLandmark::LeftHip), expected);

    // y flipped, low visibility dropped
    let hip = result.landmark(BodyLandmark::LeftHip).unwrap();
    assert!((hip.samples[0].y - 0.7).abs() < 1e-12);
    assert!(result.landmark(BodyLandmark::Nose).unwrap().is_empty());

    let center = result.joint(DerivedJoint::CenterHip).unwrap();
    assert_eq!(center.len(), 10);
    assert!((center.samples[3].x - 0.5).abs() < 1e-12);
    assert!((center.samples[3].z).abs() < 1e-12);
    assert!(result.shares_series(BodyLandmark::LeftWrist, DerivedJoint::LeftHand));

    assert_eq!(outcome.summary.frames_total, 10);
    assert_eq!(outcome.summary.frames_with_pose, 10);
    assert_eq!(outcome.summary.samples, 30);
    assert_eq!(media.seeks, 10);
}

#[tokio::test(start_paused = true)]
async fn test_detection_timeout_leaves_gap() {
    let sampler = sampler(ScriptedDetector {
        hanging: vec![5],
        ..Default::default()
    });
    let mut media = ScriptedMedia::new(1.0);

    let outcome = sampler.process_detailed(&mut media).await.unwrap();

    let hip_times = times(&outcome.result, BodyLandmark::LeftHip);
    assert_eq!(hip_times.len(), 9);
    assert!(!hip_times.iter().any(|t| (t - 0.5).abs() < 1e-9));
    assert_eq!(outcome.result.progress, 1.0);
    assert_eq!(outcome.summary.frames_timed_out, 1);
    assert_eq!(sampler.state(), SamplerState::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_detector_error_and_empty_frames_are_gaps() {
    let sampler = sampler(ScriptedDetector {
        failing: vec![1],
        empty: vec![2, 3],
        ..Default::default()
    });
    let mut media = ScriptedMedia::new(0.5);

    let outcome = sampler.process_detailed(&mut media).await.unwrap();

    assert_eq!(times(&outcome.result, BodyLandmark::RightHip), vec![0.0, 0.4]);
    assert_eq!(outcome.summary.frames_failed, 1);
    assert_eq!(outcome.summary.frames_empty, 2);
    assert_eq!(outcome.summary.frames_with_pose, 2);
}

#[tokio::test(start_paused = true)]
async fn test_progress_events() {
    let (tx, mut rx) = progress::channel();
    let sampler = sampler(ScriptedDetector {
        hanging: vec![2],
        ..Default::default()
    })
    .with_progress(tx);
    let mut media = ScriptedMedia::new(0.4);

    sampler.process(&mut media).await.unwrap();
    let events = rx.drain();

    assert_eq!(events[0], ProgressEvent::Started { total_frames: 4 });
    let fractions: Vec<f64> = events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::Frame { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert_eq!(fractions, vec![0.25, 0.5, 0.75, 1.0]);
    assert!(events.contains(&ProgressEvent::FrameMissed {
        frame_index: 2,
        reason: MissReason::DetectTimeout,
    }));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Completed { summary }) if summary.frames_timed_out == 1
    ));
}

#[tokio::test(start_paused = true)]
async fn test_capture_not_ready_is_gap() {
    let sampler = sampler(ScriptedDetector::default());
    let mut media = ScriptedMedia::new(0.3);
    media.not_ready_captures = vec![0];

    let outcome = sampler.process_detailed(&mut media).await.unwrap();

    assert_eq!(times(&outcome.result, BodyLandmark::LeftHip), vec![0.1, 0.2]);
    assert_eq!(outcome.summary.frames_failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_capture_fails_run() {
    let (tx, mut rx) = progress::channel();
    let sampler = sampler(ScriptedDetector::default()).with_progress(tx);
    let mut media = ScriptedMedia::new(0.5).playing();
    media.fatal_capture = Some(2);

    let err = sampler.process(&mut media).await.unwrap_err();

    assert!(matches!(err, PoseError::Media(MediaError::InvalidVideo(_))));
    assert_eq!(sampler.state(), SamplerState::Failed);
    assert!(matches!(rx.drain().last(), Some(ProgressEvent::Failed { .. })));
    // playback restored after the failure
    assert!(media.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_seek_timeout_is_best_effort() {
    let sampler = sampler(ScriptedDetector::default());
    let mut media = ScriptedMedia::new(0.3);
    media.hanging_seeks = vec![1];

    let outcome = sampler.process_detailed(&mut media).await.unwrap();

    // frame 1 captured at the stale position, stamped with its target time
    assert_eq!(times(&outcome.result, BodyLandmark::LeftHip), vec![0.0, 0.1, 0.2]);
    assert_eq!(outcome.summary.frames_with_pose, 3);
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_readiness_then_proceeds() {
    let sampler = sampler(ScriptedDetector::default());
    let mut media = ScriptedMedia::new(0.2);
    media.ready = ReadyState::Metadata;

    let started = Instant::now();
    let result = sampler.process(&mut media).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(times(&result, BodyLandmark::LeftHip).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_initialization_is_lazy_shared_and_retried() {
    let detector = Arc::new(ScriptedDetector {
        failing_inits: 1,
        ..Default::default()
    });
    let sampler = FrameSampler::new(detector.clone(), config());
    assert_eq!(detector.init_calls.load(Ordering::SeqCst), 0);

    let err = sampler.process(&mut ScriptedMedia::new(0.2)).await.unwrap_err();
    assert!(matches!(err, PoseError::Initialization(_)));
    assert_eq!(sampler.state(), SamplerState::Failed);
    assert_eq!(detector.detect_calls.load(Ordering::SeqCst), 0);

    let (a, b) = tokio::join!(sampler.initialize(), sampler.initialize());
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(detector.init_calls.load(Ordering::SeqCst), 2);

    sampler.process(&mut ScriptedMedia::new(0.2)).await.unwrap();
    sampler.process(&mut ScriptedMedia::new(0.2)).await.unwrap();
    assert_eq!(detector.init_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_second_run_is_busy() {
    let gate = Arc::new(Notify::new());
    let sampler = Arc::new(sampler(ScriptedDetector {
        gate: Some((1, gate.clone())),
        ..Default::default()
    }));

    let mut state = sampler.subscribe();
    let running = {
        let sampler = sampler.clone();
        tokio::spawn(async move { sampler.process(&mut ScriptedMedia::new(0.3)).await })
    };

    state
        .wait_for(|s| *s == SamplerState::AwaitingDetection { frame: 1 })
        .await
        .unwrap();

    let err = sampler.process(&mut ScriptedMedia::new(0.3)).await.unwrap_err();
    assert!(matches!(err, PoseError::Busy));

    gate.notify_one();
    let result = running.await.unwrap().unwrap();
    assert_eq!(times(&result, BodyLandmark::LeftHip).len(), 3);
    assert!(!sampler.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_discards_in_flight_detection() {
    let gate = Arc::new(Notify::new());
    let (tx, mut rx) = progress::channel();
    let sampler = Arc::new(
        sampler(ScriptedDetector {
            gate: Some((3, gate.clone())),
            ..Default::default()
        })
        .with_progress(tx),
    );

    let mut state = sampler.subscribe();
    let running = {
        let sampler = sampler.clone();
        tokio::spawn(async move {
            let mut media = ScriptedMedia::new(1.0).playing();
            let outcome = sampler.process(&mut media).await;
            (outcome, media)
        })
    };

    state
        .wait_for(|s| *s == SamplerState::AwaitingDetection { frame: 3 })
        .await
        .unwrap();
    assert!(sampler.cancel());
    gate.notify_one();

    let (outcome, media) = running.await.unwrap();
    assert!(matches!(outcome, Err(PoseError::Cancelled)));
    assert_eq!(sampler.state(), SamplerState::Cancelled);
    assert!(media.is_playing());

    let events = rx.drain();
    assert!(!events.iter().any(|e| matches!(e, ProgressEvent::Frame { frame_index: 3, .. })));
    assert_eq!(events.last(), Some(&ProgressEvent::Cancelled { progress: 0.3 }));

    // a cancelled sampler runs again from scratch
    assert!(!sampler.cancel());
    let result = sampler.process(&mut ScriptedMedia::new(0.2)).await.unwrap();
    assert_eq!(times(&result, BodyLandmark::LeftHip).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_run_marks_cancelled() {
    let (tx, mut rx) = progress::channel();
    let sampler = sampler(ScriptedDetector {
        hanging: vec![1],
        ..Default::default()
    })
    .with_progress(tx);
    let mut media = ScriptedMedia::new(1.0).playing();

    let run = sampler.process(&mut media);
    let _ = tokio::time::timeout(Duration::from_millis(100), run).await;

    assert_eq!(sampler.state(), SamplerState::Cancelled);
    assert!(!media.is_playing());

    let events = rx.drain();
    let cancelled: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::Cancelled { .. }))
        .collect();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(events.last(), Some(&ProgressEvent::Cancelled { progress: 0.1 }));
}

#[tokio::test(start_paused = true)]
async fn test_claim_clears_stale_cancel_request() {
    let sampler = sampler(ScriptedDetector::default());
    sampler.cancel.send_replace(true);

    sampler.claim().unwrap();
    assert_eq!(sampler.state(), SamplerState::Initializing);
    assert!(!*sampler.cancel.borrow());

    // a cancel issued once the run is visible sticks
    assert!(sampler.cancel());
    assert!(*sampler.cancel.borrow());
}

#[tokio::test(start_paused = true)]
async fn test_empty_media_completes() {
    let sampler = sampler(ScriptedDetector::default());
    let result = sampler.process(&mut ScriptedMedia::new(0.05)).await.unwrap();

    assert!(result.complete);
    assert_eq!(result.canonical_sample_count(), 0);
    assert_eq!(
        result.joints.len(),
        kinescope_models::LANDMARK_COUNT + DerivedJoint::ALL.len()
    );
}

#[tokio::test(start_paused = true)]
async fn test_invalid_config_rejected_before_run() {
    let sampler = FrameSampler::new(
        Arc::new(ScriptedDetector::default()),
        SamplerConfig {
            sample_rate: -1.0,
            ..Default::default()
        },
    );
    let err = sampler.process(&mut ScriptedMedia::new(1.0)).await.unwrap_err();
    assert!(matches!(err, PoseError::InvalidConfig(_)));
    assert_eq!(sampler.state(), SamplerState::Idle);
}

fn play_through(playback_rate: f64) -> SamplerConfig {
    SamplerConfig {
        mode: SamplingMode::PlayThrough { playback_rate },
        ..config()
    }
}

#[tokio::test(start_paused = true)]
async fn test_play_through_stamps_observed_position() {
    let sampler = FrameSampler::new(Arc::new(ScriptedDetector::default()), play_through(0.5));
    let mut media = ScriptedMedia::new(1.0);

    let outcome = sampler.process_detailed(&mut media).await.unwrap();
    let hip_times = times(&outcome.result, BodyLandmark::LeftHip);

    assert_eq!(hip_times.len(), 10);
    for (i, t) in hip_times.iter().enumerate() {
        assert!(*t >= i as f64 / RATE - 1e-9, "frame {} stamped at {}", i, t);
    }
    assert!(hip_times.windows(2).all(|w| w[1] - w[0] > 0.5 / RATE));
    assert_eq!(outcome.result.progress, 1.0);
    assert!(!media.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_play_through_marks_unreached_frames() {
    let sampler = FrameSampler::new(Arc::new(ScriptedDetector::default()), play_through(0.25));
    let mut media = ScriptedMedia::new(1.0);
    media.playable_until = 0.45;

    let outcome = sampler.process_detailed(&mut media).await.unwrap();

    assert_eq!(times(&outcome.result, BodyLandmark::LeftHip).len(), 5);
    assert_eq!(outcome.summary.frames_missed, 5);
    assert_eq!(outcome.result.progress, 1.0);
}
