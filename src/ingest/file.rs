//! Local file frame source.
//!
//! This module provides `FileSource` for decoding frames from local video files.
//! The file source is responsible for:
//! - Reading frames from a local video file (no network access)
//! - Decoding video frames in-memory, in order
//! - Reporting the container frame rate for timestamp derivation
//!
//! Remote sources must be downloaded by the caller first.

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};

#[cfg(feature = "video-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::FrameSource;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path (e.g., "temp_data/videos/clip.mp4"), or `stub://name`.
    pub path: String,
    /// Frame count of the synthetic source.
    pub synthetic_frames: u64,
    /// Frame size of the synthetic source.
    pub width: u32,
    pub height: u32,
    /// Frame rate reported by the synthetic source.
    pub synthetic_fps: f64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            synthetic_frames: 0,
            width: 640,
            height: 480,
            synthetic_fps: 30.0,
        }
    }
}

impl FileConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "video-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn open(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "video source must be a local path (no URL schemes): '{}'",
                config.path
            ));
        }
        if config.path.starts_with("stub://") {
            Ok(Self {
                backend: FileBackend::Synthetic(SyntheticFileSource::new(config)),
            })
        } else {
            #[cfg(feature = "video-ffmpeg")]
            {
                Ok(Self {
                    backend: FileBackend::Ffmpeg(FfmpegFileSource::new(config)?),
                })
            }
            #[cfg(not(feature = "video-ffmpeg"))]
            {
                Err(anyhow!(
                    "decoding '{}' requires the video-ffmpeg feature",
                    config.path
                ))
            }
        }
    }

    /// Container frame rate, when the source reports one.
    pub fn frame_rate(&self) -> Option<f64> {
        let fps = match &self.backend {
            FileBackend::Synthetic(source) => source.config.synthetic_fps,
            #[cfg(feature = "video-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.frame_rate(),
        };
        (fps.is_finite() && fps > 0.0).then_some(fps)
    }

    /// Get frame statistics.
    pub fn stats(&self) -> FileStats {
        match &self.backend {
            FileBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "video-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

impl FrameSource for FileSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => Ok(source.next_frame()),
            #[cfg(feature = "video-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    fn frames_read(&self) -> u64 {
        self.stats().frames_decoded
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_decoded: u64,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticFileSource {
    config: FileConfig,
    frame_count: u64,
}

impl SyntheticFileSource {
    fn new(config: FileConfig) -> Self {
        log::info!(
            "FileSource: opened {} (synthetic, {} frames)",
            config.path,
            config.synthetic_frames
        );
        Self {
            config,
            frame_count: 0,
        }
    }

    fn next_frame(&mut self) -> Option<RgbImage> {
        if self.frame_count >= self.config.synthetic_frames {
            return None;
        }
        self.frame_count += 1;
        let shade = (self.frame_count % 256) as u8;
        Some(RgbImage::from_pixel(
            self.config.width,
            self.config.height,
            Rgb([shade, shade / 2, 255 - shade]),
        ))
    }

    fn stats(&self) -> FileStats {
        FileStats {
            frames_decoded: self.frame_count,
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}
