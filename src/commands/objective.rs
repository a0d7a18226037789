//! `fbexec objective <target> <iteration>`

use anyhow::{Context, Result};

use super::ProjectArgs;

/// Print the comparison details of one target at one iteration as JSON.
pub fn execute(project: &ProjectArgs, target: &str, iteration: usize) -> Result<()> {
    let executor = project.open()?;
    let detail = executor.objective_detail(target, iteration);
    let text = serde_json::to_string_pretty(&detail).context("Failed to serialize details")?;
    println!("{text}");
    Ok(())
}
