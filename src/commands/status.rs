//! `fbexec status`

use anyhow::Result;
use colored::Colorize;

use super::ProjectArgs;
use crate::models::ExecutionStatus;

/// Print the inferred run status, iteration count and work queue snapshot.
pub fn execute(project: &ProjectArgs) -> Result<()> {
    let executor = project.open()?;
    executor.wait_for_history();

    let status = executor.status();
    let history = executor.history();

    println!("{}", "ForceBalance Project".bold().blue());
    println!("{}", "=".repeat(50));
    println!("  Root:       {}", executor.layout().root().display());
    println!("  Status:     {}", colored_status(status));
    if let Some(converged) = status.converged() {
        let label = if converged {
            "yes".green()
        } else {
            "no (step budget exhausted)".yellow()
        };
        println!("  Converged:  {label}");
    }
    println!("  Iterations: {}", history.len());
    if let Some((iteration, total)) = executor.objective_totals().into_iter().next_back() {
        println!("  Objective:  {total:.6e} (iteration {iteration})");
    }

    match executor.options() {
        Some(options) => println!(
            "  Targets:    {}",
            options.target_names().collect::<Vec<_>>().join(", ")
        ),
        None => println!(
            "  {}",
            format!("No input file at {}", executor.layout().input_file().display()).dimmed()
        ),
    }

    let queue = executor.work_queue();
    if queue.workers_total > 0 || queue.jobs_total > 0 {
        println!(
            "  Work queue: {}/{} workers busy, {}/{} jobs complete",
            queue.workers_busy, queue.workers_total, queue.jobs_done, queue.jobs_total
        );
    }

    println!();
    Ok(())
}

pub(crate) fn colored_status(status: ExecutionStatus) -> colored::ColoredString {
    match status {
        ExecutionStatus::Idle => status.name().dimmed(),
        ExecutionStatus::Running => status.name().cyan().bold(),
        ExecutionStatus::Finished { converged: true } => status.name().green().bold(),
        ExecutionStatus::Finished { converged: false } => status.name().yellow().bold(),
        ExecutionStatus::Error => status.name().red().bold(),
    }
}
