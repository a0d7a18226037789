//! Supervisor settings and the optional `fbexec.toml` file that overrides them.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::errors::{ExecError, Result};

/// Name of the optional settings file inside the project root.
pub const SETTINGS_FILE: &str = "fbexec.toml";

/// How the executor launches and watches the optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorSettings {
    /// Program launched with the input file name as its only argument.
    pub program: String,
    /// File prefix of the project (`fb` gives `fb.in`, `fb.out`, `fb.tmp`).
    pub prefix: String,
    /// Wait between liveness checks once the output stream is exhausted.
    pub interval: Duration,
    /// Checkpoint file name forced into every written input file.
    pub checkpoint_file: String,
    /// Append the child's output to the project's `.out` file.
    pub capture_output: bool,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            program: "ForceBalance".to_string(),
            prefix: "fb".to_string(),
            interval: Duration::from_secs(1),
            checkpoint_file: "checkpoint.p".to_string(),
            capture_output: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    executor: ExecutorSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExecutorSection {
    program: Option<String>,
    prefix: Option<String>,
    interval_ms: Option<u64>,
    checkpoint_file: Option<String>,
    capture_output: Option<bool>,
}

impl ExecutorSettings {
    /// Load settings from `<root>/fbexec.toml`, falling back to defaults.
    ///
    /// # Returns
    /// * `Ok(settings)` - defaults overlaid with whatever the file sets
    /// * `Err(_)` - the file exists but cannot be read or parsed
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| ExecError::io(&path, e))?;
        let file: SettingsFile = toml::from_str(&content).map_err(|e| ExecError::Decode {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let section = file.executor;
        let defaults = Self::default();
        Ok(Self {
            program: section.program.unwrap_or(defaults.program),
            prefix: section.prefix.unwrap_or(defaults.prefix),
            interval: section
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
            checkpoint_file: section.checkpoint_file.unwrap_or(defaults.checkpoint_file),
            capture_output: section.capture_output.unwrap_or(defaults.capture_output),
        })
    }
}
