use anyhow::{anyhow, Context, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::detect::backend::{ModelKind, ModelLoader, TrackParams, TrackerBackend};
use crate::records::FrameResult;

/// Read recorded tracker output: one JSON `FrameResult` per line.
///
/// Blank lines are ignored; every other line is one frame, including frames
/// without detections (`{"boxes": []}`).
pub fn read_frame_results<R: BufRead>(reader: R) -> Result<Vec<FrameResult>> {
    let mut frames = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("read frame results")?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: FrameResult = serde_json::from_str(&line)
            .map_err(|e| anyhow!("invalid frame result on line {}: {}", line_no + 1, e))?;
        frames.push(frame);
    }
    Ok(frames)
}

/// Replays recorded tracker output as if the model had produced it.
///
/// The class and confidence filters the live tracker applies are applied to
/// the recording: the class id is the last field and the confidence the one
/// before it, for both tracked and untracked detections.
pub struct ReplayBackend {
    frames: Vec<FrameResult>,
}

impl ReplayBackend {
    pub fn new(frames: Vec<FrameResult>) -> Self {
        Self { frames }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open frame results {}", path.display()))?;
        let frames = read_frame_results(std::io::BufReader::new(file))?;
        log::info!("loaded {} recorded frames from {}", frames.len(), path.display());
        Ok(Self::new(frames))
    }
}

impl TrackerBackend for ReplayBackend {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn track(&mut self, video: &str, params: &TrackParams) -> Result<Vec<FrameResult>> {
        log::debug!(
            "replaying {} frames for {} (conf={}, iou={}, tracker={})",
            self.frames.len(),
            video,
            params.confidence,
            params.iou,
            params.tracker
        );
        Ok(self
            .frames
            .iter()
            .map(|frame| {
                let kept = frame
                    .detections()
                    .iter()
                    .filter(|raw| passes_filters(raw.as_slice(), params))
                    .cloned()
                    .collect();
                FrameResult::new(kept)
            })
            .collect())
    }
}

fn passes_filters(raw: &[f64], params: &TrackParams) -> bool {
    let &[.., confidence, class_id] = raw else {
        return false;
    };
    let class_ok = params.classes.is_empty() || params.classes.contains(&(class_id.round() as i64));
    class_ok && confidence >= params.confidence
}

/// Loads a `ReplayBackend` from a recording, whatever the model kind.
pub struct ReplayLoader {
    path: PathBuf,
}

impl ReplayLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModelLoader for ReplayLoader {
    fn load(&self, kind: ModelKind) -> Result<Box<dyn TrackerBackend>> {
        log::info!(
            "model {} ({}) served from recording {}",
            kind.name(),
            kind.weights_file(),
            self.path.display()
        );
        Ok(Box::new(ReplayBackend::from_path(&self.path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDING: &str = r#"{"boxes": [[0, 0, 10, 10, 1, 0.9, 0], [0, 0, 10, 10, 2, 0.4, 0]]}

{"boxes": []}
{"boxes": [[0, 0, 10, 10, 3, 0.8, 15], [0, 0, 10, 10, 0.7, 2]]}
"#;

    #[test]
    fn reads_one_frame_per_non_blank_line() {
        let frames = read_frame_results(RECORDING.as_bytes()).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames[1].detections().is_empty());
    }

    #[test]
    fn reports_bad_lines() {
        let err = read_frame_results("{\"boxes\": []}\nnot json\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn replay_applies_class_and_confidence_filters() {
        let frames = read_frame_results(RECORDING.as_bytes()).unwrap();
        let mut backend = ReplayBackend::new(frames);
        let tracked = backend.track("clip.mp4", &TrackParams::default()).unwrap();

        assert_eq!(tracked.len(), 3);
        assert_eq!(tracked[0].detections().len(), 1);
        assert_eq!(tracked[0].detections()[0][4], 1.0);
        // class 15 is filtered, the untracked car is kept for the builder to drop
        assert_eq!(tracked[2].detections().len(), 1);
        assert_eq!(tracked[2].detections()[0].len(), 6);
    }

    #[test]
    fn empty_class_list_keeps_every_class() {
        let frames = read_frame_results(RECORDING.as_bytes()).unwrap();
        let mut backend = ReplayBackend::new(frames);
        let params = TrackParams {
            classes: vec![],
            ..TrackParams::default()
        };
        let tracked = backend.track("clip.mp4", &params).unwrap();
        assert_eq!(tracked[2].detections().len(), 2);
    }
}
