//! Seekable media sources and the shared frame buffer.

mod ffmpeg;
mod probe;

pub use ffmpeg::FfmpegMediaSource;
pub use probe::{probe_media, MediaInfo};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MediaResult;

/// How far a media source has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    Unloaded,
    /// Duration and dimensions known
    Metadata,
    /// The frame at the current position can be captured
    CurrentFrame,
    /// Playback can proceed
    CanPlay,
}

/// Encoding of [`FrameBuffer::data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameFormat {
    Png,
    /// Packed 8-bit RGB, `width * height * 3` bytes
    Rgb8,
}

/// Reusable buffer holding one captured frame.
///
/// A sampler owns exactly one and redraws it for every frame; `fill` keeps
/// the allocation.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
    pub data: Vec<u8>,
    /// Media position the frame was captured at, in seconds
    pub timestamp: f64,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            format: FrameFormat::Png,
            data: Vec::new(),
            timestamp: 0.0,
        }
    }

    /// Replace the contents with a new frame.
    pub fn fill(&mut self, width: u32, height: u32, format: FrameFormat, timestamp: f64, bytes: &[u8]) {
        self.width = width;
        self.height = height;
        self.format = format;
        self.timestamp = timestamp;
        self.data.clear();
        self.data.extend_from_slice(bytes);
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// A seekable, playable media resource.
///
/// Positions and durations are in seconds from media start.
#[async_trait]
pub trait MediaSource: Send {
    /// Total duration; non-finite or non-positive when unknown.
    fn duration(&self) -> f64;

    fn ready_state(&self) -> ReadyState;

    /// Resolve once the source can play. Callers bound this with a timeout.
    async fn wait_ready(&mut self) -> MediaResult<()>;

    /// Move to `t` and resolve once the seek has settled.
    async fn seek(&mut self, t: f64) -> MediaResult<()>;

    /// Current playback position.
    fn position(&self) -> f64;

    /// Draw the frame at the current position into `buffer`.
    async fn capture(&mut self, buffer: &mut FrameBuffer) -> MediaResult<()>;

    async fn play(&mut self) -> MediaResult<()>;

    async fn pause(&mut self) -> MediaResult<()>;

    fn is_playing(&self) -> bool;

    fn set_playback_rate(&mut self, rate: f64);

    /// Whether playback reached the end.
    fn has_ended(&self) -> bool {
        self.position() >= self.duration()
    }

    /// Source name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_reuses_allocation() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.is_empty());

        buffer.fill(4, 2, FrameFormat::Rgb8, 0.5, &[1u8; 24]);
        let capacity = buffer.data.capacity();
        buffer.fill(4, 2, FrameFormat::Rgb8, 0.6, &[2u8; 12]);

        assert_eq!(buffer.data.len(), 12);
        assert_eq!(buffer.data.capacity(), capacity);
        assert_eq!(buffer.timestamp, 0.6);
    }

    #[test]
    fn test_ready_state_ordering() {
        assert!(ReadyState::CanPlay > ReadyState::CurrentFrame);
        assert!(ReadyState::Metadata > ReadyState::Unloaded);
    }
}
