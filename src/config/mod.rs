//! ForceBalance input file support: option schema, parser and writer.

mod parser;
pub mod schema;
mod types;
mod writer;

pub use parser::{parse_input, read_input_file};
pub use schema::{OptionBlock, OptionSpec, ValueKind};
pub use types::{GeneralOptions, InputOptions, OptionMap, OptionValue, TargetOptions};
pub use writer::{render_input, write_input_file};
