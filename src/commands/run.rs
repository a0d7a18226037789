//! `fbexec run`
//!
//! Runs the optimizer in the foreground and prints every notification as it arrives. Ctrl-C
//! kills the optimizer instead of the supervisor.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use super::status::colored_status;
use super::ProjectArgs;
use crate::executor::Executor;
use crate::history::JsonObjectiveDecoder;
use crate::models::ExecutionStatus;
use crate::observer::{ChannelObserver, Event};

/// Launch the optimizer on the project's input file and follow it to the end.
pub fn execute(project: &ProjectArgs) -> Result<()> {
    let mut settings = project.settings()?;
    let program = which::which(&settings.program).with_context(|| {
        format!(
            "'{}' not found on PATH. Install ForceBalance or pass --program",
            settings.program
        )
    })?;
    settings.program = program.to_string_lossy().into_owned();

    let (tx, rx) = mpsc::channel();
    let executor = Executor::open_with(
        &project.root,
        settings,
        Box::new(JsonObjectiveDecoder),
        Some(Arc::new(ChannelObserver::new(tx))),
    )
    .with_context(|| format!("Failed to open project {}", project.root.display()))?;
    executor.wait_for_history();

    let printer = executor.clone();
    thread::spawn(move || {
        for event in rx {
            print_event(&printer, event);
        }
    });

    let killer = executor.clone();
    ctrlc::set_handler(move || {
        eprintln!("\n{}", "Interrupted, killing optimizer...".yellow());
        if let Err(e) = killer.kill() {
            eprintln!("{} {e}", "Failed to kill optimizer:".red());
        }
    })
    .context("Failed to install Ctrl-C handler")?;

    println!(
        "{} {} in {}",
        "Running".bold().blue(),
        executor.settings().program,
        executor.layout().root().display()
    );

    let status = executor.run().context("Optimizer run failed")?;

    println!("\n{} {}", "Final status:".bold(), colored_status(status));
    if status == ExecutionStatus::Error {
        bail!("optimizer reported errors; see {}", executor.layout().output_file().display());
    }
    Ok(())
}

fn print_event(executor: &Executor, event: Event) {
    match event {
        Event::StatusUpdate => {
            println!("{} {}", "status".dimmed(), colored_status(executor.status()));
        }
        Event::IterUpdate => {
            if let Some((iteration, total)) = executor.objective_totals().into_iter().next_back() {
                println!(
                    "{} {iteration:04}  objective {total:.6e}",
                    "iteration".dimmed()
                );
            }
        }
        Event::WorkQueueUpdate => {
            let queue = executor.work_queue();
            println!(
                "{} {}/{} workers busy, {}/{} jobs complete",
                "queue".dimmed(),
                queue.workers_busy,
                queue.workers_total,
                queue.jobs_done,
                queue.jobs_total
            );
        }
    }
}
