//! Supervisor for ForceBalance force-field optimization runs.
//!
//! The crate reads and writes the optimizer's input dialect, launches the optimizer on a project
//! folder, follows its output to track run status and work queue progress, and loads the
//! per-iteration objective and parameter history it leaves on disk.

pub mod commands;
pub mod config;
pub mod errors;
pub mod executor;
pub mod fs;
pub mod history;
pub mod models;
pub mod observer;
pub mod process;
pub mod settings;

pub use errors::{ExecError, Result};
pub use executor::Executor;
pub use settings::ExecutorSettings;
