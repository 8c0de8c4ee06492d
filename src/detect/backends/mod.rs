pub mod replay;

pub use replay::{read_frame_results, ReplayBackend, ReplayLoader};
