//! Local file frame source using FFmpeg.
//!
//! Frames are decoded in order and converted to packed RGB in-memory.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;

use super::file::{FileConfig, FileStats};

pub(crate) struct FfmpegFileSource {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_rate: f64,
    frame_count: u64,
    eof_sent: bool,
}

impl FfmpegFileSource {
    pub(crate) fn new(config: FileConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&config.path)
            .with_context(|| format!("failed to open video '{}' with ffmpeg", config.path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("'{}' has no video track", config.path))?;
        let stream_index = input_stream.index();
        let frame_rate = f64::from(input_stream.avg_frame_rate());
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        log::info!(
            "FileSource: opened {} (ffmpeg, {}x{} @ {:.3} fps)",
            config.path,
            decoder.width(),
            decoder.height(),
            frame_rate
        );

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
            frame_rate,
            frame_count: 0,
            eof_sent: false,
        })
    }

    pub(crate) fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb_frame = ffmpeg::frame::Video::empty();
                self.scaler
                    .run(&decoded, &mut rgb_frame)
                    .context("scale frame to RGB")?;
                self.frame_count += 1;
                return frame_to_image(&rgb_frame).map(Some);
            }
            if self.eof_sent {
                return Ok(None);
            }
            match self.next_video_packet() {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?,
                None => {
                    self.decoder
                        .send_eof()
                        .context("flush ffmpeg decoder")?;
                    self.eof_sent = true;
                }
            }
        }
    }

    pub(crate) fn stats(&self) -> FileStats {
        FileStats {
            frames_decoded: self.frame_count,
        }
    }

    fn next_video_packet(&mut self) -> Option<ffmpeg::Packet> {
        let stream_index = self.stream_index;
        self.input
            .packets()
            .find(|(stream, _)| stream.index() == stream_index)
            .map(|(_, packet)| packet)
    }
}

fn frame_to_image(frame: &ffmpeg::frame::Video) -> Result<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let pixels = if stride == row_bytes {
        data.get(..row_bytes * height as usize)
            .context("ffmpeg frame is shorter than its dimensions")?
            .to_vec()
    } else {
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let end = start + row_bytes;
            pixels.extend_from_slice(
                data.get(start..end)
                    .context("ffmpeg frame row is out of bounds")?,
            );
        }
        pixels
    };

    RgbImage::from_raw(width, height, pixels).context("decoded frame does not match its size")
}
