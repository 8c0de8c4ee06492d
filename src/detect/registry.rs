use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::records::FrameResult;

use super::backend::{ModelKind, ModelLoader, TrackParams, TrackerBackend};

pub type SharedTracker = Arc<Mutex<Box<dyn TrackerBackend>>>;

/// Caller-owned cache of loaded trackers, keyed by model kind.
///
/// Trackers are wrapped in `Mutex` because `TrackerBackend::track` takes `&mut self`.
#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<ModelKind, SharedTracker>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the tracker for `kind`, loading it on first use.
    pub fn get_or_load(&mut self, kind: ModelKind, loader: &dyn ModelLoader) -> Result<SharedTracker> {
        if let Some(tracker) = self.models.get(&kind) {
            return Ok(tracker.clone());
        }
        log::info!("loading {} model ({})", kind.name(), kind.weights_file());
        let tracker: SharedTracker = Arc::new(Mutex::new(loader.load(kind)?));
        self.models.insert(kind, tracker.clone());
        Ok(tracker)
    }

    /// Get an already loaded tracker.
    pub fn get(&self, kind: ModelKind) -> Option<SharedTracker> {
        self.models.get(&kind).cloned()
    }

    pub fn is_loaded(&self, kind: ModelKind) -> bool {
        self.models.contains_key(&kind)
    }

    /// Run the tracker for `kind` over a video.
    pub fn track(
        &mut self,
        kind: ModelKind,
        loader: &dyn ModelLoader,
        video: &str,
        params: &TrackParams,
    ) -> Result<Vec<FrameResult>> {
        let tracker = self.get_or_load(kind, loader)?;
        let mut guard = tracker
            .lock()
            .map_err(|_| anyhow!("tracker lock poisoned"))?;
        log::info!("tracking {} with {} backend", video, guard.name());
        guard.track(video, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FixedTracker {
        frames: usize,
    }

    impl TrackerBackend for FixedTracker {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn track(&mut self, _video: &str, _params: &TrackParams) -> Result<Vec<FrameResult>> {
            Ok(vec![FrameResult::default(); self.frames])
        }
    }

    struct CountingLoader {
        loads: Cell<u32>,
    }

    impl ModelLoader for CountingLoader {
        fn load(&self, kind: ModelKind) -> Result<Box<dyn TrackerBackend>> {
            self.loads.set(self.loads.get() + 1);
            if kind == ModelKind::Custom {
                return Err(anyhow!("custom weights missing"));
            }
            Ok(Box::new(FixedTracker { frames: 3 }))
        }
    }

    #[test]
    fn loads_each_kind_once() {
        let loader = CountingLoader { loads: Cell::new(0) };
        let mut registry = ModelRegistry::new();

        registry.get_or_load(ModelKind::Nano, &loader).unwrap();
        registry.get_or_load(ModelKind::Nano, &loader).unwrap();
        assert_eq!(loader.loads.get(), 1);
        assert!(registry.is_loaded(ModelKind::Nano));
        assert!(!registry.is_loaded(ModelKind::Medium));

        registry.get_or_load(ModelKind::Medium, &loader).unwrap();
        assert_eq!(loader.loads.get(), 2);
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let loader = CountingLoader { loads: Cell::new(0) };
        let mut registry = ModelRegistry::new();

        assert!(registry.get_or_load(ModelKind::Custom, &loader).is_err());
        assert!(registry.get(ModelKind::Custom).is_none());
    }

    #[test]
    fn track_runs_loaded_backend() {
        let loader = CountingLoader { loads: Cell::new(0) };
        let mut registry = ModelRegistry::new();
        let frames = registry
            .track(ModelKind::Xl, &loader, "clip.mp4", &TrackParams::default())
            .unwrap();
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn model_names_map_to_weights() {
        assert_eq!(ModelKind::from_name("XL"), ModelKind::Xl);
        assert_eq!(ModelKind::from_name("medium").weights_file(), "yolov8m.pt");
        assert_eq!(ModelKind::from_name("unknown"), ModelKind::Nano);
        assert_eq!(ModelKind::Custom.weights_file(), "best.pt");
    }
}
