//! One pipeline run over a single video.
//!
//! Stages run in order and each fully consumes the previous one:
//! tracker output -> detection records -> track summaries -> report, then
//! representative frames -> one annotation pass over the video.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use crate::detect::{ModelKind, ModelLoader, ModelRegistry, TrackParams};
use crate::ingest::{FileConfig, FileSource};
use crate::labels::LabelTable;
use crate::records::{build_records, DetectionRecord, FrameResult};
use crate::render::{AnnotationRenderer, AnnotationStyle, RenderReport};
use crate::report::SummaryTable;
use crate::select::{select_representative_frames, RepresentativeFrameMap};
use crate::timing::{AverageDuration, ConstantFps, FrameClock};
use crate::tracks::{TrackAggregator, TrackSummary};

/// How timestamps are derived for this run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClockChoice {
    /// Constant frame rate. `None` reads the rate from the video container.
    Fps(Option<f64>),
    /// Known total duration in seconds, spread evenly over the tracked frames.
    Duration(f64),
}

/// Resolve the clock once per run.
pub fn resolve_clock(
    choice: ClockChoice,
    video: &FileConfig,
    frame_count: u64,
) -> Result<Box<dyn FrameClock>> {
    match choice {
        ClockChoice::Fps(Some(fps)) => Ok(Box::new(ConstantFps::new(fps)?)),
        ClockChoice::Fps(None) => {
            let source = FileSource::open(video.clone())
                .with_context(|| format!("unable to probe frame rate of {}", video.path))?;
            let fps = source
                .frame_rate()
                .ok_or_else(|| anyhow!("{} reports no usable frame rate", video.path))?;
            log::info!("{}: {:.3} fps", video.path, fps);
            Ok(Box::new(ConstantFps::new(fps)?))
        }
        ClockChoice::Duration(seconds) => {
            let clock = AverageDuration::new(seconds, frame_count)?;
            log::info!(
                "{}: {:.1}s over {} frames, {:.4}s per frame",
                video.path,
                seconds,
                frame_count,
                clock.seconds_per_frame()
            );
            Ok(Box::new(clock))
        }
    }
}

/// Detection digest for one video.
pub struct VideoDigest {
    records: Vec<DetectionRecord>,
    tracks: TrackAggregator,
    table: SummaryTable,
    labels: LabelTable,
}

impl VideoDigest {
    /// Aggregate an already collected detection stream.
    pub fn from_frames(frames: &[FrameResult], clock: &dyn FrameClock, labels: LabelTable) -> Self {
        let records = build_records(frames, clock);
        let tracks = TrackAggregator::aggregate(&records, &labels);
        let table = SummaryTable::from_tracks(&tracks);
        log::info!("{} tracks summarised", tracks.len());
        Self {
            records,
            tracks,
            table,
            labels,
        }
    }

    /// Run the tracker through `registry`, then aggregate its output.
    pub fn process_video(
        registry: &mut ModelRegistry,
        loader: &dyn ModelLoader,
        kind: ModelKind,
        video: &FileConfig,
        params: &TrackParams,
        clock: ClockChoice,
        labels: LabelTable,
    ) -> Result<Self> {
        log::info!("video processing started for {}", video.path);
        let frames = registry.track(kind, loader, &video.path, params)?;
        let clock = resolve_clock(clock, video, frames.len() as u64)?;
        let digest = Self::from_frames(&frames, clock.as_ref(), labels);
        log::info!("video processing finished for {}", video.path);
        Ok(digest)
    }

    pub fn records(&self) -> &[DetectionRecord] {
        &self.records
    }

    pub fn summaries(&self) -> &[TrackSummary] {
        self.tracks.summaries()
    }

    pub fn track_ids(&self) -> Vec<i64> {
        self.tracks.track_ids()
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn table(&self) -> &SummaryTable {
        &self.table
    }

    pub fn csv(&self) -> String {
        self.table.to_csv()
    }

    pub fn html(&self) -> String {
        self.table.to_html()
    }

    pub fn representative_frames(&self) -> RepresentativeFrameMap {
        select_representative_frames(&self.records, &self.track_ids())
    }

    /// Write one annotated image per track into `dir`.
    ///
    /// Returns an empty report without touching the video when nothing was
    /// tracked, and an error when the video cannot be opened or decoded.
    /// Tracks without a representative frame get no image.
    pub fn write_images(
        &self,
        video: &FileConfig,
        dir: &Path,
        style: &AnnotationStyle,
    ) -> Result<RenderReport> {
        if self.tracks.is_empty() {
            log::info!("no tracked objects in {}; no images to write", video.path);
            return Ok(RenderReport::default());
        }
        let frame_map = self.representative_frames();

        let mut source = FileSource::open(video.clone()).map_err(|e| {
            log::error!("unable to open video file {}: {:#}", video.path, e);
            e.context(format!("unable to open video file {}", video.path))
        })?;
        AnnotationRenderer::new(&self.records, &self.labels, &frame_map, style)
            .render(&mut source, dir)
            .with_context(|| format!("annotating {}", video.path))
    }

    pub fn write_csv(&self, dir: &Path) -> Result<PathBuf> {
        self.table.write_csv(dir)
    }

    pub fn write_html(&self, path: &Path) -> Result<()> {
        self.table.write_html(path)
    }
}
