//! Objective and parameter histories of an optimization run.
//!
//! Two maps grow side by side: per-iteration objective records for every target, and one
//! parameter vector per iteration. After every update both maps hold the same number of
//! iterations. History grows in two ways:
//!
//! - [`IterationStore::catch_up`] reconstructs whatever a previous run left on disk and tolerates
//!   any missing piece.
//! - [`IterationStore::pull_next`] ingests exactly one new iteration announced by a live
//!   checkpoint line and fails hard when the optimizer did not write what it announced.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::artifacts::{self, ObjectiveDecoder, OBJECTIVE_FILE, PARAMETERS_FILE};
use crate::config::{InputOptions, TargetOptions};
use crate::errors::{ExecError, Result};
use crate::fs::{parse_iteration_dir_name, ProjectLayout};

/// Objective of one target at one iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveRecord {
    pub value: f64,
    /// Target weight from the options at the time the record was loaded.
    pub weight: f64,
    pub gradient: Vec<f64>,
}

impl ObjectiveRecord {
    pub fn weighted(&self) -> f64 {
        self.value * self.weight
    }
}

/// Objective records keyed by iteration, then target name.
pub type ObjectiveHistory = BTreeMap<usize, BTreeMap<String, ObjectiveRecord>>;
/// Parameter vectors keyed by iteration.
pub type ParameterHistory = BTreeMap<usize, Vec<f64>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IterationStore {
    objectives: ObjectiveHistory,
    parameters: ParameterHistory,
}

impl IterationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objectives(&self) -> &ObjectiveHistory {
        &self.objectives
    }

    pub fn parameters(&self) -> &ParameterHistory {
        &self.parameters
    }

    /// Number of iterations recorded.
    pub fn len(&self) -> usize {
        self.objectives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
    }

    pub fn clear(&mut self) {
        self.objectives.clear();
        self.parameters.clear();
    }

    /// Weighted total objective of every iteration, summed over targets.
    pub fn objective_totals(&self) -> BTreeMap<usize, f64> {
        self.objectives
            .iter()
            .map(|(iteration, records)| {
                (
                    *iteration,
                    records.values().map(ObjectiveRecord::weighted).sum(),
                )
            })
            .collect()
    }

    /// Verify both histories cover the same number of iterations.
    ///
    /// # Errors
    /// `ExecError::Consistency` with both sizes when they differ.
    pub fn check_consistency(&self) -> Result<()> {
        if self.objectives.len() != self.parameters.len() {
            return Err(ExecError::Consistency {
                objective: self.objectives.len(),
                parameters: self.parameters.len(),
            });
        }
        Ok(())
    }

    /// Rebuild history from the artifact tree left on disk.
    ///
    /// Every (target, iteration) whose objective artifact decodes is recorded. The parameter
    /// vector of an iteration comes from the first target, in configured order, with a readable
    /// one. Iterations left without either an objective or a parameter vector are dropped, so
    /// a partially written tree yields the same history whatever order the targets are listed
    /// in. A missing tmp folder leaves history empty.
    ///
    /// The previous content is replaced, so scanning an unchanged tree twice gives the same
    /// result.
    pub fn catch_up(
        &mut self,
        layout: &ProjectLayout,
        options: &InputOptions,
        decoder: &dyn ObjectiveDecoder,
    ) -> Result<()> {
        let started = Instant::now();
        let mut scanned = IterationStore::new();

        if !layout.tmp_dir().is_dir() {
            debug!(path = %layout.tmp_dir().display(), "no iteration artifacts on disk");
            *self = scanned;
            return Ok(());
        }

        for target in &options.targets {
            let target_dir = layout.target_dir(&target.name);
            if !target_dir.is_dir() {
                debug!(target = %target.name, "no artifact folder for target");
                continue;
            }

            for (iteration, dir) in iteration_dirs(&target_dir) {
                scanned.absorb(target, iteration, &dir, decoder);
            }
        }
        scanned.drop_partial_iterations();

        scanned.check_consistency()?;
        info!(
            iterations = scanned.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded iteration history"
        );
        *self = scanned;
        Ok(())
    }

    /// Record what one on-disk (target, iteration) folder holds during the catch-up scan.
    fn absorb(
        &mut self,
        target: &TargetOptions,
        iteration: usize,
        dir: &Path,
        decoder: &dyn ObjectiveDecoder,
    ) {
        if !self.parameters.contains_key(&iteration) {
            match artifacts::read_vector(&dir.join(PARAMETERS_FILE)) {
                Ok(vector) => {
                    self.parameters.insert(iteration, vector);
                }
                Err(e) => {
                    debug!(target = %target.name, iteration, error = %e, "no parameters in folder");
                }
            }
        }

        let objective_path = dir.join(OBJECTIVE_FILE);
        if !objective_path.is_file() {
            debug!(target = %target.name, iteration, "objective artifact not written yet");
            return;
        }

        match decoder.decode(&objective_path) {
            Ok(decoded) => {
                self.objectives.entry(iteration).or_default().insert(
                    target.name.clone(),
                    ObjectiveRecord {
                        value: decoded.value,
                        weight: target.weight(),
                        gradient: decoded.gradient,
                    },
                );
            }
            Err(e) => {
                warn!(target = %target.name, iteration, error = %e, "skipping unreadable objective");
            }
        }
    }

    /// Keep only iterations that have both objective records and a parameter vector.
    fn drop_partial_iterations(&mut self) {
        let objectives = &self.objectives;
        let parameters = &self.parameters;
        let partial: Vec<usize> = objectives
            .keys()
            .filter(|iteration| !parameters.contains_key(iteration))
            .chain(
                parameters
                    .keys()
                    .filter(|iteration| !objectives.contains_key(iteration)),
            )
            .copied()
            .collect();

        for iteration in partial {
            warn!(iteration, "skipping incomplete iteration");
            self.objectives.remove(&iteration);
            self.parameters.remove(&iteration);
        }
    }

    /// Ingest the next iteration after the optimizer announced a checkpoint.
    ///
    /// The iteration index is the number of iterations already recorded. Nothing is stored
    /// unless every artifact of the iteration could be read.
    ///
    /// # Returns
    /// The index of the iteration that was added.
    ///
    /// # Errors
    /// * `ExecError::MissingArtifact` - a target folder or objective artifact is missing
    /// * `ExecError::Consistency` - the parameter history is not the same size as the objective
    ///   history
    pub fn pull_next(
        &mut self,
        layout: &ProjectLayout,
        options: &InputOptions,
        decoder: &dyn ObjectiveDecoder,
    ) -> Result<usize> {
        let iteration = self.objectives.len();

        let mut dirs: Vec<(&TargetOptions, PathBuf)> = Vec::with_capacity(options.targets.len());
        for target in &options.targets {
            let dir = layout.iteration_dir(&target.name, iteration);
            if !dir.is_dir() {
                return Err(ExecError::MissingArtifact { path: dir });
            }
            dirs.push((target, dir));
        }

        if self.parameters.len() != iteration {
            return Err(ExecError::Consistency {
                objective: iteration,
                parameters: self.parameters.len(),
            });
        }

        let (_, first_dir) = dirs.first().ok_or_else(|| {
            ExecError::Precondition("no targets configured to pull iterations for".to_string())
        })?;
        let parameters = read_required(&first_dir.join(PARAMETERS_FILE), artifacts::read_vector)?;

        let mut records = BTreeMap::new();
        for (target, dir) in &dirs {
            let decoded = read_required(&dir.join(OBJECTIVE_FILE), |path| decoder.decode(path))?;
            records.insert(
                target.name.clone(),
                ObjectiveRecord {
                    value: decoded.value,
                    weight: target.weight(),
                    gradient: decoded.gradient,
                },
            );
        }

        self.parameters.insert(iteration, parameters);
        self.objectives.insert(iteration, records);
        debug!(iteration, targets = dirs.len(), "pulled iteration");
        Ok(iteration)
    }
}

/// Iteration folders under a target folder, sorted by index.
fn iteration_dirs(target_dir: &Path) -> Vec<(usize, PathBuf)> {
    let pattern = format!(
        "{}/iter_*",
        glob::Pattern::escape(&target_dir.to_string_lossy())
    );

    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %target_dir.display(), error = %e, "cannot scan target folder");
            return Vec::new();
        }
    };

    let mut dirs: Vec<(usize, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let iteration = parse_iteration_dir_name(path.file_name()?.to_str()?)?;
            Some((iteration, path))
        })
        .collect();
    dirs.sort();
    dirs
}

/// Read an artifact that must exist, reporting absence as a missing artifact.
fn read_required<T>(path: &Path, read: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
    if !path.is_file() {
        return Err(ExecError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    read(path)
}
