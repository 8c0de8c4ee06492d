mod backend;
mod backends;
mod registry;

pub use backend::{ModelKind, ModelLoader, TrackParams, TrackerBackend};
pub use backends::{read_frame_results, ReplayBackend, ReplayLoader};
pub use registry::{ModelRegistry, SharedTracker};
