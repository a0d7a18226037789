//! Status tracking for the supervised optimizer.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::errors::{ExecError, Result};
use crate::models::ExecutionStatus;
use crate::observer::{Event, ObserverHub};

/// Printed once the optimizer has converged.
pub const COMPLETION_MARKER: &str = "Calculation Finished.";
/// Printed live when the optimizer ran out of optimization steps.
pub const STEP_BUDGET_MARKER: &str = "Maximum number of optimization steps reached";
/// Closing line of a run that ended without converging.
pub const NOT_CONVERGED_MARKER: &str = "I have not failed.";
/// Lines of the output file inspected when inferring status.
const TAIL_LINES: usize = 10;

/// Current status plus the hub that hears about every change.
pub struct StatusTracker {
    status: Mutex<ExecutionStatus>,
    hub: Arc<ObserverHub>,
}

impl StatusTracker {
    pub fn new(initial: ExecutionStatus, hub: Arc<ObserverHub>) -> Self {
        Self {
            status: Mutex::new(initial),
            hub,
        }
    }

    pub fn get(&self) -> ExecutionStatus {
        *self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Assign a new status and notify the observer.
    pub fn set(&self, status: ExecutionStatus) {
        let previous = {
            let mut current = self
                .status
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::replace(&mut *current, status)
        };
        if previous != status {
            info!(from = %previous, to = %status, "status changed");
        }
        self.hub.notify(Event::StatusUpdate);
    }

    /// Assign a status unless `cancelled` reports true.
    ///
    /// `cancelled` is evaluated while the status is locked, so a concurrent [`set`](Self::set)
    /// either lands after this assignment or is observed by `cancelled`.
    ///
    /// # Returns
    /// Whether the status was assigned.
    pub fn set_unless(&self, status: ExecutionStatus, cancelled: impl FnOnce() -> bool) -> bool {
        let previous = {
            let mut current = self
                .status
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if cancelled() {
                return false;
            }
            std::mem::replace(&mut *current, status)
        };
        if previous != status {
            info!(from = %previous, to = %status, "status changed");
        }
        self.hub.notify(Event::StatusUpdate);
        true
    }

    /// Assign a status given by name.
    ///
    /// # Errors
    /// `ExecError::InvalidStatus` when `name` is outside the state set; the status is unchanged.
    pub fn set_named(&self, name: &str, converged: bool) -> Result<()> {
        let status = ExecutionStatus::from_name(name, converged)?;
        self.set(status);
        Ok(())
    }
}

/// Infer the status of a previous run from the tail of its output file.
///
/// # Returns
/// * `Idle` - no output file
/// * `Finished { converged: true }` - the tail holds the completion marker
/// * `Finished { converged: false }` - the tail shows the step budget ran out
/// * `Error` - the run stopped without either marker
pub fn infer_from_output(path: &Path) -> Result<ExecutionStatus> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ExecutionStatus::Idle),
        Err(e) => return Err(ExecError::io(path, e)),
    };
    let content = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = content.lines().collect();
    let tail = &lines[lines.len().saturating_sub(TAIL_LINES)..];

    let status = if tail.iter().any(|l| l.contains(COMPLETION_MARKER)) {
        ExecutionStatus::Finished { converged: true }
    } else if tail
        .iter()
        .any(|l| l.contains(NOT_CONVERGED_MARKER) || l.contains(STEP_BUDGET_MARKER))
    {
        ExecutionStatus::Finished { converged: false }
    } else {
        ExecutionStatus::Error
    };
    Ok(status)
}
