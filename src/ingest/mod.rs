//! Video frame sources.
//!
//! This module provides sequential decoders for the annotation pass:
//! - Local video files (feature: video-ffmpeg)
//! - Synthetic `stub://` source (testing)
//!
//! Sources decode strictly in order starting at frame 1. No source offers
//! random access; the renderer never needs it.

pub mod file;
#[cfg(feature = "video-ffmpeg")]
pub(crate) mod file_ffmpeg;

use anyhow::Result;
use image::RgbImage;

pub use file::{FileConfig, FileSource, FileStats};

/// Sequential frame decoder.
pub trait FrameSource {
    /// Decode the next frame. `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Frames decoded so far.
    fn frames_read(&self) -> u64;
}
