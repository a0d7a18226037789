//! Readers for the per-iteration files the optimizer writes.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::errors::{ExecError, Result};

/// Serialized objective of one target at one iteration.
pub const OBJECTIVE_FILE: &str = "objective.p";
/// Parameter vector of one iteration, whitespace-delimited.
pub const PARAMETERS_FILE: &str = "mvals.txt";
/// Reference versus predicted energy table of comparison targets.
pub const ENERGY_TABLE_FILE: &str = "EnergyCompare.txt";

/// Objective value and gradient decoded from an objective artifact.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DecodedObjective {
    #[serde(rename = "X")]
    pub value: f64,
    #[serde(rename = "G", default)]
    pub gradient: Vec<f64>,
}

/// Decoder for the objective artifact format.
///
/// The artifact encoding belongs to the optimizer; the executor only needs the objective value
/// and its gradient out of it.
pub trait ObjectiveDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<DecodedObjective>;
}

/// Reads `{"X": <value>, "G": [<gradient>...]}` documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonObjectiveDecoder;

impl ObjectiveDecoder for JsonObjectiveDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedObjective> {
        let content = fs::read(path).map_err(|e| ExecError::io(path, e))?;
        serde_json::from_slice(&content).map_err(|e| ExecError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Read every number of a whitespace-delimited file as one flat vector.
pub fn read_vector(path: &Path) -> Result<Vec<f64>> {
    let content = fs::read_to_string(path).map_err(|e| ExecError::io(path, e))?;
    content
        .split_whitespace()
        .map(|token| parse_number(path, token))
        .collect()
}

/// Read a whitespace-delimited numeric table, one row per non-blank line.
///
/// # Errors
/// `ExecError::Decode` when a token is not a number or rows differ in width.
pub fn read_table(path: &Path) -> Result<Vec<Vec<f64>>> {
    let content = fs::read_to_string(path).map_err(|e| ExecError::io(path, e))?;
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let row = line
            .split_whitespace()
            .map(|token| parse_number(path, token))
            .collect::<Result<Vec<_>>>()?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(ExecError::Decode {
                    path: path.to_path_buf(),
                    message: format!(
                        "row {} has {} columns, expected {}",
                        rows.len() + 1,
                        row.len(),
                        first.len()
                    ),
                });
            }
        }
        rows.push(row);
    }

    Ok(rows)
}

fn parse_number(path: &Path, token: &str) -> Result<f64> {
    token.parse::<f64>().map_err(|e| ExecError::Decode {
        path: path.to_path_buf(),
        message: format!("'{token}': {e}"),
    })
}
