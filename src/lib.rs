//! Detection Digest
//!
//! Turns the per-frame output of an object detector/tracker into a per-object
//! summary of a video and one annotated still image per tracked object.
//!
//! # Pipeline
//!
//! 1. **Timing**: frame index to seconds, either at a constant frame rate or
//!    by spreading a known duration evenly over the frames.
//! 2. **Records**: raw tracker tuples validated into typed detection records.
//! 3. **Tracks**: per-track label, enter/exit time and peak confidence.
//! 4. **Selection**: one representative frame per track near its midpoint.
//! 5. **Rendering**: a single sequential decode pass writes every track image.
//! 6. **Report**: CSV and HTML tables with `MM:SS` timestamps.
//!
//! # Module Structure
//!
//! - `detect`: Tracker boundary and the caller-owned model registry
//! - `ingest`: Sequential video frame sources
//! - `pipeline`: One run over one video, tying the stages together

pub mod config;
pub mod detect;
pub mod ingest;
pub mod labels;
pub mod pipeline;
pub mod records;
pub mod render;
pub mod report;
pub mod select;
pub mod timing;
pub mod tracks;

pub use config::DigestConfig;
pub use detect::{ModelKind, ModelLoader, ModelRegistry, ReplayLoader, TrackParams, TrackerBackend};
pub use ingest::{FileConfig, FileSource, FrameSource};
pub use labels::LabelTable;
pub use pipeline::{resolve_clock, ClockChoice, VideoDigest};
pub use records::{build_records, BoundingBox, DetectionRecord, FrameResult};
pub use render::{AnnotationRenderer, AnnotationStyle, RenderReport};
pub use report::{format_mmss, SummaryTable};
pub use select::{
    select_representative_frame, select_representative_frames, RepresentativeFrameMap,
    REPRESENTATIVE_FRAME_OFFSET,
};
pub use timing::{parse_duration, AverageDuration, ConstantFps, FrameClock};
pub use tracks::{TrackAggregator, TrackSummary};
