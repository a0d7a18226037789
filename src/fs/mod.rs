//! Project folder layout and file helpers.

pub mod layout;

pub use layout::{parse_iteration_dir_name, ProjectLayout};
