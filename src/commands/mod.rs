//! Command implementations for the `fbexec` binary.

pub mod clean;
pub mod config;
pub mod history;
pub mod objective;
pub mod run;
pub mod status;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::executor::Executor;
use crate::settings::ExecutorSettings;

/// Project folder plus command line overrides of `fbexec.toml`.
#[derive(Debug, Clone)]
pub struct ProjectArgs {
    pub root: PathBuf,
    pub program: Option<String>,
    pub prefix: Option<String>,
    pub interval_ms: Option<u64>,
}

impl ProjectArgs {
    /// Settings from `fbexec.toml`, with command line flags taking precedence.
    pub fn settings(&self) -> Result<ExecutorSettings> {
        let mut settings = ExecutorSettings::load(&self.root)
            .with_context(|| format!("Failed to load settings from {}", self.root.display()))?;
        if let Some(program) = &self.program {
            settings.program = program.clone();
        }
        if let Some(prefix) = &self.prefix {
            settings.prefix = prefix.clone();
        }
        if let Some(ms) = self.interval_ms {
            settings.interval = Duration::from_millis(ms);
        }
        Ok(settings)
    }

    pub fn open(&self) -> Result<Executor> {
        let settings = self.settings()?;
        Executor::open(&self.root, settings)
            .with_context(|| format!("Failed to open project {}", self.root.display()))
    }
}
