use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{ExecError, Result};

/// Prefix of per-iteration folders inside a target's temp folder.
const ITERATION_DIR_PREFIX: &str = "iter_";
/// File name of the optimizer's restart checkpoint.
const RESTART_FILE: &str = "restart.p";

/// File layout of a ForceBalance project folder.
///
/// ```text
/// <root>/
///   fb.in                          input options
///   fb.out                         captured optimizer output
///   fb.tmp/<target>/iter_0000/     per-iteration artifacts
///   result/                        final force field
///   fb.err fb.bak fb.sav restart.p bookkeeping removed on clean
/// ```
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
    prefix: String,
}

impl ProjectLayout {
    pub fn new<P: AsRef<Path>>(root: P, prefix: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            prefix: prefix.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Input file name relative to the root, as passed to the optimizer.
    pub fn input_file_name(&self) -> String {
        format!("{}.in", self.prefix)
    }

    pub fn input_file(&self) -> PathBuf {
        self.root.join(self.input_file_name())
    }

    pub fn output_file(&self) -> PathBuf {
        self.root.join(format!("{}.out", self.prefix))
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join(format!("{}.tmp", self.prefix))
    }

    pub fn result_dir(&self) -> PathBuf {
        self.root.join("result")
    }

    pub fn target_dir(&self, target: &str) -> PathBuf {
        self.tmp_dir().join(target)
    }

    /// Folder holding the artifacts of `target` at `iteration`, e.g. `fb.tmp/water/iter_0003`.
    pub fn iteration_dir(&self, target: &str, iteration: usize) -> PathBuf {
        self.target_dir(target)
            .join(format!("{ITERATION_DIR_PREFIX}{iteration:04}"))
    }

    /// Bookkeeping files written next to the input file.
    pub fn bookkeeping_files(&self) -> Vec<PathBuf> {
        ["err", "bak", "sav"]
            .iter()
            .map(|ext| self.root.join(format!("{}.{ext}", self.prefix)))
            .chain(std::iter::once(self.root.join(RESTART_FILE)))
            .collect()
    }

    /// Remove every output of a run. Missing paths are skipped.
    ///
    /// # Returns
    /// The paths that were actually removed.
    pub fn clean(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        let candidates = [self.output_file(), self.tmp_dir(), self.result_dir()]
            .into_iter()
            .chain(self.bookkeeping_files());

        for path in candidates {
            let outcome = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match outcome {
                Ok(()) => {
                    debug!(path = %path.display(), "removed");
                    removed.push(path);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(ExecError::io(path, e)),
            }
        }

        Ok(removed)
    }
}

/// Iteration index encoded in a folder name such as `iter_0012`.
pub fn parse_iteration_dir_name(name: &str) -> Option<usize> {
    name.strip_prefix(ITERATION_DIR_PREFIX)?.parse().ok()
}
