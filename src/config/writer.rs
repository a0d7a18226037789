//! Serializer for the ForceBalance input dialect.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::types::{InputOptions, OptionValue};
use crate::errors::{ExecError, Result};

const KEY_WIDTH: usize = 30;
const PRIOR_WIDTH: usize = 35;
/// Verbosity requested from every target so per-iteration comparison tables get written.
const TARGET_WRITELEVEL: i64 = 3;

/// Render the option tree as input file text.
///
/// The general block always enables per-step checkpoint writing into `checkpoint_file`, and
/// every target is written with an elevated `writelevel`.
pub fn render_input(options: &InputOptions, checkpoint_file: &str) -> String {
    let mut general = options.general.clone();
    general.set("writechk_step", true);
    general.set("writechk", checkpoint_file);

    let mut out = String::from("$options\n");
    for (key, value) in general.iter() {
        write_option(&mut out, key, value);
    }
    out.push_str("priors\n");
    for (rule, value) in &options.priors {
        let _ = writeln!(
            out,
            "   {rule:<width$}  : {}",
            format_prior(*value),
            width = PRIOR_WIDTH
        );
    }
    out.push_str("/priors\n");
    out.push_str("$end\n\n");

    for target in &options.targets {
        out.push_str("$target\n");
        write_option(&mut out, "name", &OptionValue::Str(target.name.clone()));
        for (key, value) in &target.values {
            if key != "writelevel" {
                write_option(&mut out, key, value);
            }
        }
        write_option(&mut out, "writelevel", &OptionValue::Int(TARGET_WRITELEVEL));
        out.push_str("$end\n\n");
    }

    out
}

/// Write the option tree to `path`.
pub fn write_input_file(path: &Path, options: &InputOptions, checkpoint_file: &str) -> Result<()> {
    let content = render_input(options, checkpoint_file);
    fs::write(path, content).map_err(|e| ExecError::io(path, e))?;
    info!(path = %path.display(), targets = options.targets.len(), "wrote input file");
    Ok(())
}

fn write_option(out: &mut String, key: &str, value: &OptionValue) {
    if matches!(value, OptionValue::List(items) if items.is_empty()) {
        debug!(key, "skipping empty list option");
        return;
    }
    let _ = writeln!(out, "{key:<width$} {value}", width = KEY_WIDTH);
}

/// One decimal of mantissa with a signed two-digit exponent, e.g. `1.0e-01`.
fn format_prior(value: f64) -> String {
    let rendered = format!("{value:.1e}");
    match rendered.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => rendered,
    }
}
