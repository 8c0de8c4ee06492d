//! Per-track temporal summaries.

use std::collections::HashMap;

use crate::labels::LabelTable;
use crate::records::DetectionRecord;

/// Summary of one tracked object over the whole video.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackSummary {
    pub track_id: i64,
    /// Label of the class id carried by the track's first record.
    pub label: String,
    pub enter_ts: f64,
    pub exit_ts: f64,
    /// Highest confidence seen for the track, rounded to 2 decimals.
    pub peak_confidence: f64,
}

/// Groups detection records by track identity.
///
/// Tracks keep the order in which they first appear in the record sequence.
#[derive(Clone, Debug, Default)]
pub struct TrackAggregator {
    tracks: Vec<TrackSummary>,
    index: HashMap<i64, usize>,
}

impl TrackAggregator {
    pub fn aggregate(records: &[DetectionRecord], labels: &LabelTable) -> Self {
        let mut aggregator = Self::default();
        for record in records {
            aggregator.observe(record, labels);
        }
        // Rounding happens once the raw maximum is known.
        for track in &mut aggregator.tracks {
            track.peak_confidence = round_to(track.peak_confidence, 2);
        }
        aggregator
    }

    fn observe(&mut self, record: &DetectionRecord, labels: &LabelTable) {
        match self.index.get(&record.track_id) {
            Some(&slot) => {
                let track = &mut self.tracks[slot];
                track.enter_ts = track.enter_ts.min(record.timestamp);
                track.exit_ts = track.exit_ts.max(record.timestamp);
                track.peak_confidence = track.peak_confidence.max(record.confidence);
            }
            None => {
                self.index.insert(record.track_id, self.tracks.len());
                self.tracks.push(TrackSummary {
                    track_id: record.track_id,
                    label: labels.resolve(record.class_id),
                    enter_ts: record.timestamp,
                    exit_ts: record.timestamp,
                    peak_confidence: record.confidence,
                });
            }
        }
    }

    pub fn summaries(&self) -> &[TrackSummary] {
        &self.tracks
    }

    pub fn get(&self, track_id: i64) -> Option<&TrackSummary> {
        self.index.get(&track_id).map(|&slot| &self.tracks[slot])
    }

    /// Track ids in first-appearance order.
    pub fn track_ids(&self) -> Vec<i64> {
        self.tracks.iter().map(|track| track.track_id).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::BoundingBox;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn record(frame_index: u64, track_id: i64, confidence: f64, class_id: i64) -> DetectionRecord {
        DetectionRecord {
            frame_index,
            timestamp: frame_index as f64 * 0.5,
            bbox: BoundingBox {
                xmin: 0.0,
                ymin: 0.0,
                xmax: 10.0,
                ymax: 10.0,
            },
            track_id,
            confidence,
            class_id,
        }
    }

    #[test]
    fn empty_input_yields_no_tracks() {
        let aggregator = TrackAggregator::aggregate(&[], &LabelTable::coco());
        assert!(aggregator.is_empty());
        assert!(aggregator.track_ids().is_empty());
    }

    #[test]
    fn summarises_enter_exit_and_peak() {
        let records = vec![
            record(2, 4, 0.61, 2),
            record(3, 4, 0.876, 2),
            record(7, 4, 0.7, 2),
        ];
        let aggregator = TrackAggregator::aggregate(&records, &LabelTable::coco());
        let track = aggregator.get(4).unwrap();
        assert_eq!(track.label, "car");
        assert_eq!(track.enter_ts, 1.0);
        assert_eq!(track.exit_ts, 3.5);
        assert_eq!(track.peak_confidence, 0.88);
    }

    #[test]
    fn label_comes_from_first_record() {
        let records = vec![record(1, 9, 0.5, 16), record(2, 9, 0.99, 15)];
        let aggregator = TrackAggregator::aggregate(&records, &LabelTable::coco());
        assert_eq!(aggregator.get(9).unwrap().label, "dog");
    }

    #[test]
    fn tracks_keep_first_appearance_order() {
        let records = vec![
            record(1, 12, 0.5, 0),
            record(1, 3, 0.5, 0),
            record(2, 12, 0.5, 0),
            record(3, 8, 0.5, 0),
        ];
        let aggregator = TrackAggregator::aggregate(&records, &LabelTable::coco());
        assert_eq!(aggregator.track_ids(), vec![12, 3, 8]);
    }

    #[test]
    fn enter_never_exceeds_exit_on_random_streams() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let len = rng.gen_range(1..60);
            let mut records: Vec<DetectionRecord> = (0..len)
                .map(|_| {
                    let mut r = record(
                        rng.gen_range(1..500),
                        rng.gen_range(0..6),
                        rng.gen_range(0.0..=1.0),
                        rng.gen_range(0..80),
                    );
                    r.timestamp = rng.gen_range(0.0..3600.0);
                    r
                })
                .collect();
            records.sort_by_key(|r| r.frame_index);

            let aggregator = TrackAggregator::aggregate(&records, &LabelTable::coco());
            assert!(!aggregator.is_empty());
            for track in aggregator.summaries() {
                assert!(track.enter_ts <= track.exit_ts, "{:?}", track);
                assert!((0.0..=1.0).contains(&track.peak_confidence));
            }
        }
    }
}
