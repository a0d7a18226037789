//! Parser for the block-structured ForceBalance input dialect.
//!
//! ```text
//! $options
//! jobtype      newton
//! forcefield   water.itp
//! priors
//!    VDWS:sigma   : 1.0e-01
//! /priors
//! $end
//!
//! $target
//! name         cluster-02
//! type         AbInitio_GMX
//! $end
//! ```
//!
//! Markers are matched case-insensitively on the whole (comment-stripped) line. Everything after
//! a `#` is a comment.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use super::schema::{self, OptionBlock, ValueKind};
use super::types::{GeneralOptions, InputOptions, OptionMap, OptionValue, TargetOptions};
use crate::errors::{ExecError, Result};

/// Token index of the value on a `read_mvals` line (`<index> <name> <value>`).
const READ_MVALS_VALUE_TOKEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    General,
    Priors,
    Target,
    Discarded,
}

#[derive(Default)]
struct RawTree {
    general: GeneralOptions,
    priors: BTreeMap<String, f64>,
    targets: Vec<OptionMap>,
}

/// Read and parse an input file.
pub fn read_input_file(path: &Path) -> Result<InputOptions> {
    let content = fs::read_to_string(path).map_err(|e| ExecError::io(path, e))?;
    let options = parse_input(&content)?;
    debug!(
        path = %path.display(),
        general = options.general.len(),
        priors = options.priors.len(),
        targets = options.targets.len(),
        "parsed input file"
    );
    Ok(options)
}

/// Parse input file content into a normalized option tree.
pub fn parse_input(content: &str) -> Result<InputOptions> {
    let mut raw = RawTree::default();
    let mut block = Block::None;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let content = line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        match content.to_lowercase().as_str() {
            "$options" => block = Block::General,
            "priors" => block = Block::Priors,
            "/priors" | "/read_mvals" => block = Block::General,
            "read_mvals" => block = Block::Discarded,
            "$target" => {
                raw.targets.push(OptionMap::new());
                block = Block::Target;
            }
            "$end" => block = Block::None,
            _ => parse_content_line(&mut raw, block, content, line_no)?,
        }
    }

    finalize(raw)
}

fn parse_content_line(raw: &mut RawTree, block: Block, content: &str, line_no: usize) -> Result<()> {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    let key = tokens[0];

    match block {
        Block::None => Err(ExecError::Format {
            line: line_no,
            message: format!("'{content}' is not inside any block"),
        }),
        Block::Discarded => {
            let token = tokens.get(READ_MVALS_VALUE_TOKEN).ok_or_else(|| ExecError::Format {
                line: line_no,
                message: format!("read_mvals entry '{content}' has no value"),
            })?;
            token.parse::<f64>().map_err(|e| ExecError::Format {
                line: line_no,
                message: format!("read_mvals value '{token}': {e}"),
            })?;
            Ok(())
        }
        Block::Priors => {
            let token = tokens[tokens.len() - 1];
            let value = token.parse::<f64>().map_err(|e| ExecError::Format {
                line: line_no,
                message: format!("prior '{key}' value '{token}': {e}"),
            })?;
            raw.priors.insert(key.to_string(), value);
            Ok(())
        }
        Block::General => {
            let value = parse_value(OptionBlock::General, &tokens, line_no)?;
            raw.general.values_mut().insert(key.to_string(), value);
            Ok(())
        }
        Block::Target => {
            let value = parse_value(OptionBlock::Target, &tokens, line_no)?;
            // A $target marker always precedes Block::Target.
            if let Some(target) = raw.targets.last_mut() {
                target.insert(key.to_string(), value);
            }
            Ok(())
        }
    }
}

fn parse_value(block: OptionBlock, tokens: &[&str], line_no: usize) -> Result<OptionValue> {
    let key = tokens[0];
    let spec = schema::lookup(block, key).ok_or_else(|| ExecError::Schema {
        line: line_no,
        block: block.name(),
        key: key.to_string(),
        message: "unknown option".to_string(),
    })?;

    let cast = |token: &str| {
        OptionValue::parse_scalar(spec.kind, token).map_err(|message| ExecError::Format {
            line: line_no,
            message: format!("option '{key}': {message}"),
        })
    };

    match &tokens[1..] {
        [] if spec.kind == ValueKind::Bool => Ok(OptionValue::Bool(true)),
        [] => Err(ExecError::Schema {
            line: line_no,
            block: block.name(),
            key: key.to_string(),
            message: "missing value for non-bool option".to_string(),
        }),
        [single] => cast(single),
        many => many
            .iter()
            .map(|token| cast(token))
            .collect::<Result<Vec<_>>>()
            .map(OptionValue::List),
    }
}

fn coerce_lists(block: OptionBlock, values: &mut OptionMap) {
    for (key, value) in values.iter_mut() {
        if schema::lookup(block, key).is_some_and(|spec| spec.list) {
            *value = std::mem::replace(value, OptionValue::List(Vec::new())).into_list();
        }
    }
}

fn finalize(raw: RawTree) -> Result<InputOptions> {
    let RawTree {
        mut general,
        priors,
        targets,
    } = raw;

    let mut options = InputOptions {
        priors,
        ..Default::default()
    };

    for mut values in targets {
        let name = match values.remove("name") {
            Some(OptionValue::Str(name)) if !name.is_empty() => name,
            _ => {
                return Err(ExecError::InvalidOptions(
                    "every $target block needs a name".to_string(),
                ))
            }
        };
        values
            .entry("weight".to_string())
            .or_insert(OptionValue::Float(1.0));
        if let Some(OptionValue::Str(kind)) = values.get_mut("type") {
            *kind = kind.to_uppercase();
        }
        coerce_lists(OptionBlock::Target, &mut values);
        options.upsert_target(TargetOptions { name, values });
    }

    coerce_lists(OptionBlock::General, general.values_mut());

    if let Some(raw_job) = general.jobtype() {
        let job = schema::canonical_job_type(raw_job).ok_or_else(|| {
            ExecError::InvalidOptions(format!("unsupported jobtype '{raw_job}'"))
        })?;
        general.set("jobtype", job);
    }
    if let Some(OptionValue::Str(penalty)) = general.values_mut().get_mut("penalty_type") {
        *penalty = penalty.to_uppercase();
    }
    if general.forcefield().is_empty() {
        return Err(ExecError::InvalidOptions(
            "forcefield must name at least one file".to_string(),
        ));
    }
    if general.get("normalize_weights").and_then(OptionValue::as_bool) == Some(true) {
        return Err(ExecError::InvalidOptions(
            "normalize_weights is not supported".to_string(),
        ));
    }

    options.general = general;
    Ok(options)
}
