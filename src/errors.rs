//! Error types for the fbexec library.
//!
//! Every fallible library operation returns [`ExecError`]. The variants follow the failure
//! categories of a supervised run: config parse failures are fatal for the whole parse, history
//! contract violations are fatal for the pull that detected them, and everything else is
//! propagated to the caller as a hard failure of the session.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Canonical error type for the executor.
#[derive(Debug, Error)]
pub enum ExecError {
    /// A config line could not be parsed, or sits outside any block.
    #[error("malformed input at line {line}: {message}")]
    Format { line: usize, message: String },

    /// The parsed option tree failed whole-file validation.
    #[error("invalid input options: {0}")]
    InvalidOptions(String),

    /// An option key is not part of the schema for its block, or lacks a required value.
    #[error("line {line}: {message} ({block} option '{key}')")]
    Schema {
        line: usize,
        block: &'static str,
        key: String,
        message: String,
    },

    /// The optimizer did not write an artifact it announced with a checkpoint line.
    #[error("missing artifact: {}", path.display())]
    MissingArtifact { path: PathBuf },

    /// Objective and parameter histories disagree on the number of recorded iterations.
    #[error(
        "iteration history out of sync: {objective} objective iterations, {parameters} parameter vectors"
    )]
    Consistency { objective: usize, parameters: usize },

    /// An operation was requested in a state that does not allow it.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A status name outside the fixed state set.
    #[error("invalid status '{0}', expected one of IDLE, RUNNING, FINISHED, ERROR")]
    InvalidStatus(String),

    /// An artifact existed but could not be decoded.
    #[error("failed to decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    /// Filesystem or process I/O failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ExecError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error means the optimizer broke its on-disk write contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ExecError::MissingArtifact { .. } | ExecError::Consistency { .. }
        )
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, ExecError>;
