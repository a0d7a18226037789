//! `fbexec clean`

use anyhow::{Context, Result};
use colored::Colorize;

use super::ProjectArgs;

/// Remove every output of previous runs, keeping the input file.
pub fn execute(project: &ProjectArgs) -> Result<()> {
    let executor = project.open()?;
    executor.wait_for_history();

    let removed = executor
        .clean_up()
        .context("Failed to clean project outputs")?;

    if removed.is_empty() {
        println!("{}", "Nothing to clean".dimmed());
        return Ok(());
    }
    for path in &removed {
        println!("  {} {}", "removed".red(), path.display());
    }
    println!(
        "\n{} {} path(s)",
        "Cleaned".green().bold(),
        removed.len()
    );
    Ok(())
}
