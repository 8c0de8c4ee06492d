use anyhow::Result;

use crate::records::FrameResult;

/// Detector weight variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Nano,
    Medium,
    Xl,
    Custom,
}

impl ModelKind {
    /// Parse a model selection. Unknown names select `Nano`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "medium" => ModelKind::Medium,
            "xl" => ModelKind::Xl,
            "custom" => ModelKind::Custom,
            _ => ModelKind::Nano,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Nano => "nano",
            ModelKind::Medium => "medium",
            ModelKind::Xl => "xl",
            ModelKind::Custom => "custom",
        }
    }

    pub fn weights_file(&self) -> &'static str {
        match self {
            ModelKind::Nano => "yolov8n.pt",
            ModelKind::Medium => "yolov8m.pt",
            ModelKind::Xl => "yolov8x.pt",
            ModelKind::Custom => "best.pt",
        }
    }
}

/// Parameters handed to the tracker for one video.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackParams {
    /// Minimum detection confidence.
    pub confidence: f64,
    /// IoU threshold for non-maximum suppression.
    pub iou: f64,
    /// Class ids to keep.
    pub classes: Vec<i64>,
    /// Tracker configuration name.
    pub tracker: String,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            confidence: 0.5,
            iou: 0.5,
            // people and vehicles
            classes: (0..=8).collect(),
            tracker: "bytetrack.yaml".to_string(),
        }
    }
}

/// Detection-and-tracking model boundary.
///
/// The model itself lives outside this crate. Implementations produce one
/// `FrameResult` per decoded frame, in decode order.
pub trait TrackerBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection and tracking over a whole video.
    fn track(&mut self, video: &str, params: &TrackParams) -> Result<Vec<FrameResult>>;
}

/// Loads a tracker for a model kind.
pub trait ModelLoader {
    fn load(&self, kind: ModelKind) -> Result<Box<dyn TrackerBackend>>;
}
