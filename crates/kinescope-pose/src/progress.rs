//! Progress reporting for sampling runs.
//!
//! The sampler emits events through a bounded channel without blocking; when
//! the receiver lags, events are dropped rather than stalling the run.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Why a frame produced no samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// The detector did not answer in time
    DetectTimeout,
    /// The detector reported an error for this frame
    DetectFailed,
    /// The media could not provide the frame
    CaptureFailed,
    /// Playback ended before the frame's time was reached
    PlaybackEnded,
}

/// Counts gathered over one sampling run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub frames_total: usize,
    /// Frames where the detector reported at least one landmark
    pub frames_with_pose: usize,
    /// Frames where the detector answered with no landmarks
    pub frames_empty: usize,
    pub frames_timed_out: usize,
    /// Frames lost to detector or capture errors
    pub frames_failed: usize,
    /// Frames never reached because playback ended
    pub frames_missed: usize,
    /// Samples stored across canonical landmarks
    pub samples: usize,
}

impl RunSummary {
    pub(crate) fn record_miss(&mut self, reason: MissReason) {
        match reason {
            MissReason::DetectTimeout => self.frames_timed_out += 1,
            MissReason::DetectFailed | MissReason::CaptureFailed => self.frames_failed += 1,
            MissReason::PlaybackEnded => self.frames_missed += 1,
        }
    }

    /// Frames that yielded no samples for any reason.
    pub fn gaps(&self) -> usize {
        self.frames_timed_out + self.frames_failed + self.frames_missed
    }
}

/// Progress event emitted during a sampling run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Detector ready, frame loop starting
    Started { total_frames: usize },

    /// A frame finished (with or without samples)
    Frame { frame_index: usize, progress: f64 },

    /// A frame produced no samples
    FrameMissed {
        frame_index: usize,
        reason: MissReason,
    },

    /// Run completed
    Completed { summary: RunSummary },

    /// Run cancelled
    Cancelled { progress: f64 },

    /// Run failed
    Failed { error: String },
}

/// Progress sender for async contexts.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressSender {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Send a progress event (non-blocking).
    pub fn send(&self, event: ProgressEvent) {
        // Drop events if the channel is full
        let _ = self.tx.try_send(event);
    }

    pub fn started(&self, total_frames: usize) {
        self.send(ProgressEvent::Started { total_frames });
    }

    pub fn frame(&self, frame_index: usize, progress: f64) {
        self.send(ProgressEvent::Frame {
            frame_index,
            progress,
        });
    }

    pub fn frame_missed(&self, frame_index: usize, reason: MissReason) {
        self.send(ProgressEvent::FrameMissed {
            frame_index,
            reason,
        });
    }

    pub fn completed(&self, summary: RunSummary) {
        self.send(ProgressEvent::Completed { summary });
    }

    pub fn cancelled(&self, progress: f64) {
        self.send(ProgressEvent::Cancelled { progress });
    }

    pub fn failed(&self, error: impl Into<String>) {
        self.send(ProgressEvent::Failed {
            error: error.into(),
        });
    }
}

/// Progress receiver for collecting events.
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::Receiver<ProgressEvent>,
}

impl ProgressReceiver {
    /// Receive the next progress event.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Try to receive a progress event without blocking.
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.rx.try_recv().ok()
    }

    /// Take every event currently queued.
    pub fn drain(&mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Default channel capacity.
pub const DEFAULT_CAPACITY: usize = 256;

/// Create a progress channel pair.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    channel_with_capacity(DEFAULT_CAPACITY)
}

pub fn channel_with_capacity(capacity: usize) -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ProgressSender::new(tx), ProgressReceiver { rx })
}
