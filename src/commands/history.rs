//! `fbexec history`

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;

use super::ProjectArgs;
use crate::history::IterationStore;

#[derive(Serialize)]
struct HistoryReport<'a> {
    #[serde(flatten)]
    store: &'a IterationStore,
    totals: BTreeMap<usize, f64>,
}

/// Print the iteration history found on disk.
pub fn execute(project: &ProjectArgs, json: bool) -> Result<()> {
    let executor = project.open()?;
    executor.wait_for_history();
    let store = executor.history();
    let totals = store.objective_totals();

    if json {
        let report = HistoryReport {
            store: &store,
            totals,
        };
        let text =
            serde_json::to_string_pretty(&report).context("Failed to serialize history")?;
        println!("{text}");
        return Ok(());
    }

    if store.is_empty() {
        println!("{}", "No iterations recorded".dimmed());
        return Ok(());
    }

    println!("{}", "Iteration History".bold().blue());
    println!("{}", "─".repeat(50).dimmed());
    for (iteration, records) in store.objectives() {
        let total = totals.get(iteration).copied().unwrap_or_default();
        println!("{} {total:>16.6e}", format!("iter {iteration:04}").bold());
        for (target, record) in records {
            println!(
                "    {target:<30} {:>14.6e}  (weight {})",
                record.value, record.weight
            );
        }
    }
    Ok(())
}
