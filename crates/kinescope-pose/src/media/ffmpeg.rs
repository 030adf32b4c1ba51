//! Media source backed by the FFmpeg command line tools.
//!
//! Frames are decoded on demand: each capture runs one `ffmpeg` process that
//! seeks to the current position and writes a single PNG to stdout. Playback
//! is simulated from a monotonic clock scaled by the playback rate.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::debug;

use super::probe::{probe_media, MediaInfo};
use super::{FrameBuffer, FrameFormat, MediaSource, ReadyState};
use crate::error::{MediaError, MediaResult};

#[derive(Debug, Clone, Copy)]
struct PlayClock {
    started: Instant,
    from: f64,
}

/// FFmpeg-backed [`MediaSource`] over a local file.
#[derive(Debug)]
pub struct FfmpegMediaSource {
    path: PathBuf,
    info: MediaInfo,
    position: f64,
    rate: f64,
    clock: Option<PlayClock>,
}

impl FfmpegMediaSource {
    /// Probe `path` and open it at position 0, paused.
    pub async fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let info = probe_media(path).await?;
        debug!(
            path = %path.display(),
            duration = info.duration,
            width = info.width,
            height = info.height,
            fps = info.fps,
            "Opened media"
        );

        Ok(Self::with_info(path, info))
    }

    fn with_info(path: &Path, info: MediaInfo) -> Self {
        Self {
            path: path.to_path_buf(),
            info,
            position: 0.0,
            rate: 1.0,
            clock: None,
        }
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn clamp(&self, t: f64) -> f64 {
        t.clamp(0.0, self.info.duration)
    }

    fn capture_args(&self, position: f64) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-ss".to_string(),
            format!("{:.3}", position),
            "-i".to_string(),
            self.path.to_string_lossy().to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-f".to_string(),
            "image2pipe".to_string(),
            "-vcodec".to_string(),
            "png".to_string(),
            "pipe:1".to_string(),
        ]
    }
}

#[async_trait]
impl MediaSource for FfmpegMediaSource {
    fn duration(&self) -> f64 {
        self.info.duration
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::CanPlay
    }

    async fn wait_ready(&mut self) -> MediaResult<()> {
        Ok(())
    }

    async fn seek(&mut self, t: f64) -> MediaResult<()> {
        self.position = self.clamp(t);
        if self.clock.is_some() {
            self.clock = Some(PlayClock {
                started: Instant::now(),
                from: self.position,
            });
        }
        Ok(())
    }

    fn position(&self) -> f64 {
        match self.clock {
            Some(clock) => {
                self.clamp(clock.from + clock.started.elapsed().as_secs_f64() * self.rate)
            }
            None => self.position,
        }
    }

    async fn capture(&mut self, buffer: &mut FrameBuffer) -> MediaResult<()> {
        let position = self.position();

        let output = Command::new("ffmpeg")
            .args(self.capture_args(position))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::capture_failed(position, stderr.trim().to_string()));
        }
        if output.stdout.is_empty() {
            return Err(MediaError::capture_failed(position, "ffmpeg produced no frame"));
        }

        buffer.fill(
            self.info.width,
            self.info.height,
            FrameFormat::Png,
            position,
            &output.stdout,
        );
        Ok(())
    }

    async fn play(&mut self) -> MediaResult<()> {
        if self.clock.is_none() {
            self.clock = Some(PlayClock {
                started: Instant::now(),
                from: self.position,
            });
        }
        Ok(())
    }

    async fn pause(&mut self) -> MediaResult<()> {
        self.position = self.position();
        self.clock = None;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.clock.is_some()
    }

    fn set_playback_rate(&mut self, rate: f64) {
        // Re-anchor so the rate change applies from now on
        if self.clock.is_some() {
            self.position = self.position();
            self.clock = Some(PlayClock {
                started: Instant::now(),
                from: self.position,
            });
        }
        self.rate = rate;
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn source(duration: f64) -> FfmpegMediaSource {
        FfmpegMediaSource::with_info(
            Path::new("clip.mp4"),
            MediaInfo {
                duration,
                width: 640,
                height: 360,
                fps: 30.0,
                codec: "h264".to_string(),
            },
        )
    }

    #[test]
    fn test_capture_args() {
        let args = source(10.0).capture_args(1.25);
        assert_eq!(&args[2..4], &["-ss".to_string(), "1.250".to_string()]);
        assert!(args.contains(&"image2pipe".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[tokio::test]
    async fn test_seek_clamps() {
        let mut media = source(2.0);
        media.seek(5.0).await.unwrap();
        assert_eq!(media.position(), 2.0);
        assert!(media.has_ended());
        media.seek(-1.0).await.unwrap();
        assert_eq!(media.position(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_clock_scaled_by_rate() {
        let mut media = source(10.0);
        media.set_playback_rate(0.25);
        media.play().await.unwrap();
        assert!(media.is_playing());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!((media.position() - 0.5).abs() < 1e-6);

        media.pause().await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!((media.position() - 0.5).abs() < 1e-6);
        assert!(!media.is_playing());
    }
}
