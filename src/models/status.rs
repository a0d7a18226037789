use serde::{Deserialize, Serialize};

use crate::errors::{ExecError, Result};

/// Run status of the external optimizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    #[default]
    Idle,
    Running,
    /// The optimizer exited normally; `converged` is false when it ran out of steps.
    Finished { converged: bool },
    Error,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl ExecutionStatus {
    /// Names of the fixed state set.
    pub const NAMES: [&'static str; 4] = ["IDLE", "RUNNING", "FINISHED", "ERROR"];

    pub fn name(&self) -> &'static str {
        match self {
            ExecutionStatus::Idle => "IDLE",
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Finished { .. } => "FINISHED",
            ExecutionStatus::Error => "ERROR",
        }
    }

    /// Build a status from its name.
    ///
    /// `converged` is only meaningful for `FINISHED` and ignored otherwise.
    ///
    /// # Errors
    /// `ExecError::InvalidStatus` when `name` is not one of [`ExecutionStatus::NAMES`].
    pub fn from_name(name: &str, converged: bool) -> Result<Self> {
        match name.to_uppercase().as_str() {
            "IDLE" => Ok(ExecutionStatus::Idle),
            "RUNNING" => Ok(ExecutionStatus::Running),
            "FINISHED" => Ok(ExecutionStatus::Finished { converged }),
            "ERROR" => Ok(ExecutionStatus::Error),
            _ => Err(ExecError::InvalidStatus(name.to_string())),
        }
    }

    /// `Some(converged)` when finished, `None` in every other state.
    pub fn converged(&self) -> Option<bool> {
        match self {
            ExecutionStatus::Finished { converged } => Some(*converged),
            _ => None,
        }
    }

    /// Returns true for states that end monitoring.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Finished { .. })
    }
}
