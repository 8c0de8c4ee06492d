//! Typed detection records built from raw per-frame tracker output.
//!
//! The tracker emits one `FrameResult` per decoded frame. Each raw detection is
//! a numeric tuple `[xmin, ymin, xmax, ymax, track_id, confidence, class_id]`.
//! When the tracker could not assign an identity it emits six fields instead;
//! those are dropped here and never travel further as untyped arrays.

use serde::{Deserialize, Serialize};

use crate::timing::FrameClock;

/// Number of fields in a tracked detection.
pub const TRACKED_DETECTION_FIELDS: usize = 7;

/// Tracker output for a single decoded frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    #[serde(default)]
    pub boxes: Vec<Vec<f64>>,
}

impl FrameResult {
    pub fn new(boxes: Vec<Vec<f64>>) -> Self {
        Self { boxes }
    }

    pub fn detections(&self) -> &[Vec<f64>] {
        &self.boxes
    }
}

/// Pixel-space bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// One detected object instance in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionRecord {
    /// 1-based index of the frame in decode order.
    pub frame_index: u64,
    /// Seconds since the start of the video.
    pub timestamp: f64,
    pub bbox: BoundingBox,
    pub track_id: i64,
    pub confidence: f64,
    pub class_id: i64,
}

impl DetectionRecord {
    /// Validate a raw tracker tuple. Returns `None` unless it has exactly
    /// seven fields.
    pub fn from_raw(raw: &[f64], frame_index: u64, timestamp: f64) -> Option<Self> {
        let &[xmin, ymin, xmax, ymax, track_id, confidence, class_id] = raw else {
            return None;
        };
        Some(Self {
            frame_index,
            timestamp,
            bbox: BoundingBox {
                xmin,
                ymin,
                xmax,
                ymax,
            },
            track_id: track_id.round() as i64,
            confidence,
            class_id: class_id.round() as i64,
        })
    }
}

/// Counters for one build pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub frames: u64,
    pub kept: u64,
    pub dropped: u64,
}

/// Flattens frame results into detection records.
pub struct RecordBuilder<'a> {
    clock: &'a dyn FrameClock,
    records: Vec<DetectionRecord>,
    stats: BuildStats,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(clock: &'a dyn FrameClock) -> Self {
        Self {
            clock,
            records: Vec::new(),
            stats: BuildStats::default(),
        }
    }

    /// Consume the next frame. The frame counter advances even when the frame
    /// yields no valid detections.
    pub fn push_frame(&mut self, frame: &FrameResult) {
        self.stats.frames += 1;
        let frame_index = self.stats.frames;
        let timestamp = self.clock.timestamp_for(frame_index);

        for raw in frame.detections() {
            match DetectionRecord::from_raw(raw, frame_index, timestamp) {
                Some(record) => {
                    self.stats.kept += 1;
                    self.records.push(record);
                }
                None => {
                    self.stats.dropped += 1;
                    log::debug!(
                        "frame {}: skipping detection with {} fields (expected {})",
                        frame_index,
                        raw.len(),
                        TRACKED_DETECTION_FIELDS
                    );
                }
            }
        }
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    pub fn finish(self) -> (Vec<DetectionRecord>, BuildStats) {
        (self.records, self.stats)
    }
}

/// Build the flat record sequence for a complete detection stream.
pub fn build_records(frames: &[FrameResult], clock: &dyn FrameClock) -> Vec<DetectionRecord> {
    let mut builder = RecordBuilder::new(clock);
    for frame in frames {
        builder.push_frame(frame);
    }
    let (records, stats) = builder.finish();
    log::info!(
        "built {} detection records from {} frames ({} untracked detections dropped)",
        stats.kept,
        stats.frames,
        stats.dropped
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::ConstantFps;

    fn tracked(track_id: f64, confidence: f64, class_id: f64) -> Vec<f64> {
        vec![10.0, 20.0, 110.0, 220.0, track_id, confidence, class_id]
    }

    #[test]
    fn keeps_seven_field_detections_only() {
        let clock = ConstantFps::new(30.0).unwrap();
        let frame = FrameResult::new(vec![
            tracked(3.0, 0.8, 0.0),
            vec![10.0, 20.0, 110.0, 220.0, 0.8, 0.0],
        ]);

        let records = build_records(&[frame], &clock);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].track_id, 3);
        assert_eq!(records[0].class_id, 0);
        assert_eq!(records[0].confidence, 0.8);
        assert_eq!(records[0].bbox.xmax, 110.0);
    }

    #[test]
    fn frame_counter_advances_over_empty_frames() {
        let clock = ConstantFps::new(2.0).unwrap();
        let frames = vec![
            FrameResult::default(),
            FrameResult::new(vec![vec![1.0, 2.0, 3.0, 4.0, 0.5, 2.0]]),
            FrameResult::new(vec![tracked(1.0, 0.7, 2.0)]),
        ];

        let mut builder = RecordBuilder::new(&clock);
        for frame in &frames {
            builder.push_frame(frame);
        }
        let (records, stats) = builder.finish();

        assert_eq!(
            stats,
            BuildStats {
                frames: 3,
                kept: 1,
                dropped: 1
            }
        );
        assert_eq!(records[0].frame_index, 3);
        assert_eq!(records[0].timestamp, 1.5);
    }

    #[test]
    fn preserves_frame_and_detection_order() {
        let clock = ConstantFps::new(1.0).unwrap();
        let frames = vec![
            FrameResult::new(vec![tracked(5.0, 0.6, 0.0), tracked(2.0, 0.9, 1.0)]),
            FrameResult::new(vec![tracked(2.0, 0.8, 1.0)]),
        ];

        let records = build_records(&frames, &clock);
        let order: Vec<(u64, i64)> = records
            .iter()
            .map(|r| (r.frame_index, r.track_id))
            .collect();
        assert_eq!(order, vec![(1, 5), (1, 2), (2, 2)]);
    }

    #[test]
    fn frame_result_parses_from_json_line() {
        let frame: FrameResult =
            serde_json::from_str(r#"{"boxes": [[1, 2, 3, 4, 9, 0.75, 2]]}"#).unwrap();
        assert_eq!(frame.detections().len(), 1);

        let empty: FrameResult = serde_json::from_str("{}").unwrap();
        assert!(empty.detections().is_empty());
    }
}
