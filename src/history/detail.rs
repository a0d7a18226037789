//! Per-target comparison details for a single iteration.

use serde::Serialize;

use super::artifacts::{read_table, ENERGY_TABLE_FILE};
use crate::config::InputOptions;
use crate::fs::ProjectLayout;

/// Target type prefixes whose iterations carry an energy comparison table.
const COMPARISON_TYPE_PREFIXES: &[&str] = &["abinitio", "torsionprofile"];

/// Reference versus predicted energies of one target at one iteration.
///
/// Failures are reported through `error` instead of being raised, so callers can forward the
/// value as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectiveDetail {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub qm_energies: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mm_energies: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weights: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ObjectiveDetail {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Whether targets of this type write an energy comparison table.
pub fn has_comparison_table(target_type: &str) -> bool {
    let lower = target_type.to_lowercase();
    COMPARISON_TYPE_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Load the comparison table of `target` at `iteration`.
pub fn objective_detail(
    layout: &ProjectLayout,
    options: &InputOptions,
    target: &str,
    iteration: usize,
) -> ObjectiveDetail {
    let Some(config) = options.target(target) else {
        return ObjectiveDetail::failed(format!("target '{target}' not found"));
    };

    let dir = layout.iteration_dir(target, iteration);
    if !dir.is_dir() {
        return ObjectiveDetail::failed(format!(
            "iteration {iteration} of target '{target}' not found"
        ));
    }

    let target_type = config.target_type().unwrap_or_default();
    if !has_comparison_table(target_type) {
        return ObjectiveDetail::failed(format!(
            "details not implemented for target type '{target_type}'"
        ));
    }

    let rows = match read_table(&dir.join(ENERGY_TABLE_FILE)) {
        Ok(rows) => rows,
        Err(e) => return ObjectiveDetail::failed(e.to_string()),
    };
    match rows.first() {
        None => return ObjectiveDetail::failed(format!("{ENERGY_TABLE_FILE} is empty")),
        Some(row) if row.len() != 4 => {
            return ObjectiveDetail::failed(format!(
                "{ENERGY_TABLE_FILE} must have 4 columns, found {}",
                row.len()
            ));
        }
        Some(_) => {}
    }

    let column = |idx: usize| rows.iter().map(|row| row[idx]).collect::<Vec<_>>();
    ObjectiveDetail {
        qm_energies: column(0),
        mm_energies: column(1),
        diff: column(2),
        weights: column(3),
        error: None,
    }
}
