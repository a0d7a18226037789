use serde::Serialize;

use crate::errors::{ExecError, Result};

const WORKERS_MARKER: &str = "workers busy";
const JOBS_MARKER: &str = "jobs complete";

/// Worker and job counts reported by the distributed work queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkQueueSnapshot {
    pub workers_busy: u32,
    pub workers_total: u32,
    pub jobs_done: u32,
    pub jobs_total: u32,
}

impl WorkQueueSnapshot {
    /// Whether `line` is a work queue progress report.
    pub fn is_progress_line(line: &str) -> bool {
        line.contains(WORKERS_MARKER) && line.contains(JOBS_MARKER)
    }

    /// Parse a progress line such as `12/40 workers busy, 301/500 jobs complete`.
    ///
    /// Each ratio is the whitespace-delimited token right before its marker phrase.
    pub fn parse(line: &str) -> Result<Self> {
        let (workers_busy, workers_total) = ratio_before(line, WORKERS_MARKER)?;
        let (jobs_done, jobs_total) = ratio_before(line, JOBS_MARKER)?;
        Ok(Self {
            workers_busy,
            workers_total,
            jobs_done,
            jobs_total,
        })
    }
}

fn ratio_before(line: &str, marker: &str) -> Result<(u32, u32)> {
    let malformed = |detail: &str| ExecError::Format {
        line: 0,
        message: format!("work queue line '{}': {detail}", line.trim_end()),
    };

    let idx = line
        .find(marker)
        .ok_or_else(|| malformed(&format!("no '{marker}'")))?;
    let token = line[..idx]
        .split_whitespace()
        .last()
        .ok_or_else(|| malformed(&format!("nothing before '{marker}'")))?;
    let (left, right) = token
        .split_once('/')
        .ok_or_else(|| malformed(&format!("'{token}' is not a ratio")))?;
    let parse = |s: &str| {
        s.parse::<u32>()
            .map_err(|e| malformed(&format!("'{s}' in '{token}': {e}")))
    };
    Ok((parse(left)?, parse(right)?))
}
