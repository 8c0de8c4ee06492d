//! Single-pass annotation of representative frames.
//!
//! The video is decoded once, in order. Whenever the frame counter reaches a
//! track's representative frame, that track's box and `label confidence` text
//! are drawn on a copy of the frame and written as
//! `detection{track_id}_{label}.jpg`. Decode cost is one pass over the video
//! no matter how many tracks there are.

use ab_glyph::{FontArc, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ingest::FrameSource;
use crate::labels::LabelTable;
use crate::records::DetectionRecord;
use crate::select::RepresentativeFrameMap;
use crate::tracks::round_to;

/// DejaVu Sans, used for the overlay text unless another font is set.
const BUNDLED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// Distance in pixels between the text baseline area and the box bottom.
const TEXT_LIFT: i32 = 15;

/// Drawing parameters for the overlay.
pub struct AnnotationStyle {
    pub box_color: Rgb<u8>,
    pub box_thickness: u32,
    pub text_color: Rgb<u8>,
    pub text_scale: f32,
    /// Text is skipped when no font is available.
    pub font: Option<FontArc>,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            box_color: Rgb([200, 0, 200]),
            box_thickness: 2,
            text_color: Rgb([155, 20, 155]),
            text_scale: 24.0,
            font: bundled_font().ok(),
        }
    }
}

impl AnnotationStyle {
    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Boxes only, no overlay text.
    pub fn without_font(mut self) -> Self {
        self.font = None;
        self
    }

    /// Load a TrueType/OpenType font for the overlay text.
    pub fn load_font(path: &Path) -> Result<FontArc> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        FontArc::try_from_vec(bytes).map_err(|e| anyhow!("invalid font {}: {}", path.display(), e))
    }
}

/// The font compiled into the crate.
pub fn bundled_font() -> Result<FontArc> {
    FontArc::try_from_slice(BUNDLED_FONT).map_err(|e| anyhow!("invalid bundled font: {}", e))
}

/// Outcome of a completed annotation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Frames decoded during the pass.
    pub frames_read: u64,
    /// One image per annotated track, in the order they were written.
    pub images: Vec<PathBuf>,
}

/// Image file name for a track.
pub fn image_file_name(track_id: i64, label: &str) -> String {
    format!("detection{}_{}.jpg", track_id, sanitize_label(label))
}

fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | ' ' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub struct AnnotationRenderer<'a> {
    records: HashMap<(i64, u64), &'a DetectionRecord>,
    frames: HashMap<u64, Vec<i64>>,
    labels: &'a LabelTable,
    style: &'a AnnotationStyle,
}

impl<'a> AnnotationRenderer<'a> {
    pub fn new(
        records: &'a [DetectionRecord],
        labels: &'a LabelTable,
        frame_map: &RepresentativeFrameMap,
        style: &'a AnnotationStyle,
    ) -> Self {
        let frames = frame_map.by_frame();
        let mut wanted = HashMap::new();
        for record in records {
            let key = (record.track_id, record.frame_index);
            let selected = frame_map.get(record.track_id) == Some(record.frame_index);
            if selected {
                // First record wins when a track repeats within a frame.
                wanted.entry(key).or_insert(record);
            }
        }
        Self {
            records: wanted,
            frames,
            labels,
            style,
        }
    }

    /// Decode `source` once and write one annotated image per track into
    /// `out_dir`.
    pub fn render<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        out_dir: &Path,
    ) -> Result<RenderReport> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create image directory {}", out_dir.display()))?;

        let mut report = RenderReport::default();
        let pending = self.frames.values().map(Vec::len).sum::<usize>();
        if pending == 0 {
            log::info!("no tracks to annotate; skipping video decode");
            return Ok(report);
        }

        let mut frame_counter = 0u64;
        while let Some(frame) = source
            .next_frame()
            .with_context(|| format!("decode failed after frame {}", frame_counter))?
        {
            frame_counter += 1;
            let Some(track_ids) = self.frames.get(&frame_counter) else {
                continue;
            };
            for &track_id in track_ids {
                let record = self.records.get(&(track_id, frame_counter)).ok_or_else(|| {
                    anyhow!(
                        "track {} has no detection at frame {}",
                        track_id,
                        frame_counter
                    )
                })?;
                let path = self.write_annotated(&frame, record, out_dir)?;
                report.images.push(path);
            }
        }
        report.frames_read = frame_counter;

        if report.images.len() < pending {
            log::warn!(
                "video ended after {} frames; {} of {} track images written",
                frame_counter,
                report.images.len(),
                pending
            );
        }
        log::info!(
            "wrote {} images to {} in one pass over {} frames",
            report.images.len(),
            out_dir.display(),
            frame_counter
        );
        Ok(report)
    }

    fn write_annotated(
        &self,
        frame: &RgbImage,
        record: &DetectionRecord,
        out_dir: &Path,
    ) -> Result<PathBuf> {
        let label = self.labels.resolve(record.class_id);
        let mut canvas = frame.clone();
        annotate(&mut canvas, record, &label, self.style);

        let path = out_dir.join(image_file_name(record.track_id, &label));
        canvas
            .save(&path)
            .with_context(|| format!("failed to write image {}", path.display()))?;
        log::debug!("track {}: wrote {}", record.track_id, path.display());
        Ok(path)
    }
}

/// Draw the box and `label confidence` overlay for one record.
pub fn annotate(canvas: &mut RgbImage, record: &DetectionRecord, label: &str, style: &AnnotationStyle) {
    // Clamped to just past the canvas edges so the outline math stays in range.
    let margin = style.box_thickness.min(1024) as i32 + 1;
    let (width, height) = canvas.dimensions();
    let clamp_x = |v: f64| clamp_coordinate(v, width, margin);
    let clamp_y = |v: f64| clamp_coordinate(v, height, margin);
    let x1 = clamp_x(record.bbox.xmin);
    let y1 = clamp_y(record.bbox.ymin);
    let x2 = clamp_x(record.bbox.xmax);
    let y2 = clamp_y(record.bbox.ymax);

    for t in 0..margin - 1 {
        let width = x2 - x1 - 2 * t;
        let height = y2 - y1 - 2 * t;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(x1 + t, y1 + t).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, style.box_color);
    }

    let text = format!("{} {}", label, round_to(record.confidence, 3));
    match &style.font {
        Some(font) => {
            let y = y2
                .saturating_sub(TEXT_LIFT)
                .saturating_sub(style.text_scale as i32)
                .max(0);
            draw_text_mut(
                canvas,
                style.text_color,
                x1.max(0),
                y,
                PxScale::from(style.text_scale),
                font,
                &text,
            );
        }
        None => log::debug!(
            "track {}: no overlay font, skipping text '{}'",
            record.track_id,
            text
        ),
    }
}

fn clamp_coordinate(value: f64, extent: u32, margin: i32) -> i32 {
    let low = -f64::from(margin);
    let high = f64::from(extent.min(i32::MAX as u32 / 2)) + f64::from(margin);
    value.round().clamp(low, high) as i32
}
