//! Representative frame selection.
//!
//! Each track is depicted by one frame close to the temporal midpoint of its
//! lifetime. The probe starts `REPRESENTATIVE_FRAME_OFFSET` frames before the
//! midpoint and walks forward to the first frame that actually holds a
//! detection of the track, never past the track's last frame.

use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::records::DetectionRecord;

/// Frames to step back from the midpoint before probing forward.
pub const REPRESENTATIVE_FRAME_OFFSET: u64 = 4;

/// `track_id -> frame_index`. Every mapped frame holds a detection of its
/// track. Tracks whose selection failed are kept apart with the reason.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepresentativeFrameMap {
    frames: BTreeMap<i64, u64>,
    failures: BTreeMap<i64, String>,
}

impl RepresentativeFrameMap {
    pub fn get(&self, track_id: i64) -> Option<u64> {
        self.frames.get(&track_id).copied()
    }

    /// Tracks without a representative frame, with the reason.
    pub fn failures(&self) -> impl Iterator<Item = (i64, &str)> + '_ {
        self.failures
            .iter()
            .map(|(&track_id, reason)| (track_id, reason.as_str()))
    }

    pub fn failure(&self, track_id: i64) -> Option<&str> {
        self.failures.get(&track_id).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        self.frames.iter().map(|(&track_id, &frame)| (track_id, frame))
    }

    /// Tracks to annotate on each frame, keyed by frame index.
    pub fn by_frame(&self) -> HashMap<u64, Vec<i64>> {
        let mut by_frame: HashMap<u64, Vec<i64>> = HashMap::new();
        for (track_id, frame) in self.iter() {
            by_frame.entry(frame).or_default().push(track_id);
        }
        by_frame
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
struct Span {
    first: u64,
    last: u64,
}

/// Per-track frame spans and the `(track, frame)` pairs that hold a
/// detection.
struct TrackFrames {
    spans: HashMap<i64, Span>,
    present: HashSet<(i64, u64)>,
}

impl TrackFrames {
    fn index(records: &[DetectionRecord]) -> Self {
        let mut spans: HashMap<i64, Span> = HashMap::new();
        let mut present = HashSet::with_capacity(records.len());
        for record in records {
            present.insert((record.track_id, record.frame_index));
            spans
                .entry(record.track_id)
                .and_modify(|span| {
                    span.first = span.first.min(record.frame_index);
                    span.last = span.last.max(record.frame_index);
                })
                .or_insert(Span {
                    first: record.frame_index,
                    last: record.frame_index,
                });
        }
        Self { spans, present }
    }

    fn select(&self, track_id: i64) -> Result<u64> {
        let span = self
            .spans
            .get(&track_id)
            .ok_or_else(|| anyhow!("track {} has no detection records", track_id))?;

        let midpoint = (span.first + span.last) / 2;
        let start = midpoint.saturating_sub(REPRESENTATIVE_FRAME_OFFSET);
        let frame = (start..=span.last)
            .find(|&candidate| self.present.contains(&(track_id, candidate)))
            .ok_or_else(|| {
                anyhow!(
                    "no detection of track {} between frames {} and {}",
                    track_id,
                    start,
                    span.last
                )
            })?;

        log::debug!(
            "track {}: frames {}..={}, representative frame {}",
            track_id,
            span.first,
            span.last,
            frame
        );
        Ok(frame)
    }
}

/// Pick one representative frame for a single track.
///
/// Fails when the track has no records, or when no detection of the track is
/// found between the probe start and the track's last frame.
pub fn select_representative_frame(records: &[DetectionRecord], track_id: i64) -> Result<u64> {
    TrackFrames::index(records).select(track_id)
}

/// Pick one representative frame for every requested track.
///
/// A failed selection only affects its own track: it is logged and recorded
/// in [`RepresentativeFrameMap::failures`], and the other tracks are still
/// selected.
pub fn select_representative_frames(
    records: &[DetectionRecord],
    track_ids: &[i64],
) -> RepresentativeFrameMap {
    let index = TrackFrames::index(records);
    let mut map = RepresentativeFrameMap::default();
    for &track_id in track_ids {
        match index.select(track_id) {
            Ok(frame) => {
                map.frames.insert(track_id, frame);
            }
            Err(e) => {
                log::error!("no representative frame for track {}: {:#}", track_id, e);
                map.failures.insert(track_id, format!("{:#}", e));
            }
        }
    }
    map
}
