//! Supervision of ForceBalance runs.

pub mod core;
pub mod monitor;
pub mod status;

pub use self::core::{Executor, RunInfo};
pub use monitor::{LineKind, CHECKPOINT_MARKER};
pub use status::{infer_from_output, StatusTracker};
