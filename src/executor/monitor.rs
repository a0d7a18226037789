//! Monitor loop over the optimizer's merged output stream.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::thread;

use tracing::{debug, info, warn};

use super::core::Executor;
use super::status::{COMPLETION_MARKER, STEP_BUDGET_MARKER};
use crate::errors::{ExecError, Result};
use crate::models::{ExecutionStatus, WorkQueueSnapshot};
use crate::observer::Event;

/// Printed by the optimizer after it persisted the artifacts of an iteration.
pub const CHECKPOINT_MARKER: &str = "Writing the checkpoint file";
const ERROR_MARKER: &str = "error";

/// What a single output line means to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Checkpoint,
    Converged,
    StepBudgetReached,
    Error,
    Progress,
    Other,
}

impl LineKind {
    /// Classify a line. Earlier rules win when several markers appear on one line.
    pub fn classify(line: &str) -> Self {
        if line.contains(CHECKPOINT_MARKER) {
            LineKind::Checkpoint
        } else if line.contains(COMPLETION_MARKER) {
            LineKind::Converged
        } else if line.contains(STEP_BUDGET_MARKER) {
            LineKind::StepBudgetReached
        } else if line.contains(ERROR_MARKER) {
            LineKind::Error
        } else if WorkQueueSnapshot::is_progress_line(line) {
            LineKind::Progress
        } else {
            LineKind::Other
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

impl Executor {
    /// Read the child's output until a terminal line, or until the child exits and the stream is
    /// exhausted.
    pub(super) fn monitor(&self, output: File, mut capture: Option<File>) -> Result<()> {
        let output_path = self.shared.layout.output_file();
        let mut reader = BufReader::new(output);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| ExecError::io(&output_path, e))?;

            if read == 0 {
                if self.child_exited() {
                    debug!("optimizer exited and output is exhausted");
                    return Ok(());
                }
                thread::sleep(self.shared.settings.interval);
                continue;
            }

            if let Some(file) = capture.as_mut() {
                file.write_all(&buf)
                    .map_err(|e| ExecError::io(&output_path, e))?;
            }

            if self.shared.was_killed() {
                debug!("optimizer was killed, leaving output unprocessed");
                drain(reader, capture);
                return Ok(());
            }

            let line = String::from_utf8_lossy(&buf);
            match self.handle_line(line.trim_end()) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => {
                    drain(reader, capture);
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, "stopped monitoring");
                    self.set_status_unless_killed(ExecutionStatus::Error);
                    drain(reader, capture);
                    return Err(e);
                }
            }
        }
    }

    fn handle_line(&self, line: &str) -> Result<Flow> {
        match LineKind::classify(line) {
            LineKind::Checkpoint => {
                let iteration = self.pull_iteration()?;
                info!(iteration, "iteration recorded");
                self.shared.hub.notify(Event::IterUpdate);
            }
            LineKind::Converged => {
                self.set_status_unless_killed(ExecutionStatus::Finished { converged: true });
                return Ok(Flow::Stop);
            }
            LineKind::StepBudgetReached => {
                self.set_status_unless_killed(ExecutionStatus::Finished { converged: false });
                return Ok(Flow::Stop);
            }
            LineKind::Error => {
                warn!(line, "optimizer reported an error");
                self.set_status_unless_killed(ExecutionStatus::Error);
            }
            LineKind::Progress => match WorkQueueSnapshot::parse(line) {
                Ok(snapshot) => {
                    *self.shared.lock_work_queue() = snapshot;
                    self.shared.hub.notify(Event::WorkQueueUpdate);
                }
                Err(e) => warn!(error = %e, "ignoring malformed work queue line"),
            },
            LineKind::Other => {}
        }
        Ok(Flow::Continue)
    }

    /// A kill that raced past the check in the read loop keeps its IDLE status.
    fn set_status_unless_killed(&self, status: ExecutionStatus) {
        let shared = &self.shared;
        if !shared.status.set_unless(status, || shared.was_killed()) {
            debug!(%status, "optimizer was killed, status left unchanged");
        }
    }

    fn pull_iteration(&self) -> Result<usize> {
        let options = self.options().ok_or_else(|| {
            ExecError::Precondition("checkpoint announced without loaded input options".to_string())
        })?;
        let mut history = self.shared.lock_history();
        history.pull_next(&self.shared.layout, &options, self.shared.decoder.as_ref())
    }
}

/// Keep reading whatever the child still writes so it never blocks on a full pipe.
fn drain(mut reader: BufReader<File>, capture: Option<File>) {
    let spawned = thread::Builder::new()
        .name("fbexec-drain".to_string())
        .spawn(move || {
            let copied = match capture {
                Some(mut file) => io::copy(&mut reader, &mut file),
                None => io::copy(&mut reader, &mut io::sink()),
            };
            match copied {
                Ok(bytes) => debug!(bytes, "drained remaining output"),
                Err(e) => debug!(error = %e, "output drain stopped"),
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "could not start output drain thread");
    }
}
