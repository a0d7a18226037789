//! The executor: owns the project folder, launches the optimizer and keeps the derived state
//! (status, work queue, iteration history) current.
//!
//! `run`, `kill`, `clean_up` and the catch-up scan exclude each other through one coarse lock.
//! The monitor loop started by `run` releases that lock once the child is spawned, so `kill` can
//! interrupt a running optimizer from another thread.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::status::{infer_from_output, StatusTracker};
use crate::config::{
    read_input_file, write_input_file, GeneralOptions, InputOptions, TargetOptions,
};
use crate::errors::{ExecError, Result};
use crate::fs::ProjectLayout;
use crate::history::{
    objective_detail, IterationStore, JsonObjectiveDecoder, ObjectiveDecoder, ObjectiveDetail,
};
use crate::models::{ExecutionStatus, WorkQueueSnapshot};
use crate::observer::{Event, Observer, ObserverHub};
use crate::process;
use crate::settings::ExecutorSettings;

/// Metadata about the most recent run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunInfo {
    pub started_at: Option<DateTime<Utc>>,
    pub pid: Option<u32>,
    /// Whether this executor ever launched the optimizer.
    pub ever_spawned: bool,
}

pub(super) struct Shared {
    pub(super) layout: ProjectLayout,
    pub(super) settings: ExecutorSettings,
    pub(super) status: StatusTracker,
    pub(super) hub: Arc<ObserverHub>,
    pub(super) decoder: Box<dyn ObjectiveDecoder>,
    options: RwLock<Option<InputOptions>>,
    work_queue: Mutex<WorkQueueSnapshot>,
    history: Mutex<IterationStore>,
    child: Mutex<Option<Child>>,
    run_info: Mutex<RunInfo>,
    catch_up: Mutex<Option<JoinHandle<()>>>,
    /// Set by `kill` so the monitor stops acting on output still in the pipe.
    killed: AtomicBool,
    op_lock: Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn lock_ops(&self) -> MutexGuard<'_, ()> {
        lock(&self.op_lock)
    }

    pub(super) fn lock_history(&self) -> MutexGuard<'_, IterationStore> {
        lock(&self.history)
    }

    pub(super) fn lock_work_queue(&self) -> MutexGuard<'_, WorkQueueSnapshot> {
        lock(&self.work_queue)
    }

    pub(super) fn mark_killed(&self) {
        self.killed.store(true, Ordering::SeqCst);
    }

    pub(super) fn was_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }
}

/// Handle to a supervised ForceBalance project. Clones share the same state.
#[derive(Clone)]
pub struct Executor {
    pub(super) shared: Arc<Shared>,
}

impl Executor {
    /// Open a project folder with the default objective decoder and no observer.
    pub fn open<P: AsRef<Path>>(root: P, settings: ExecutorSettings) -> Result<Self> {
        Self::open_with(root, settings, Box::new(JsonObjectiveDecoder), None)
    }

    /// Open a project folder.
    ///
    /// Reads the input file if there is one, infers the status of a previous run from its output,
    /// and starts the catch-up scan of the artifact tree in the background. `observer` is
    /// registered before the scan starts, so it hears about its completion.
    ///
    /// # Errors
    /// Fails when an existing input file does not parse or the output file cannot be read.
    pub fn open_with<P: AsRef<Path>>(
        root: P,
        settings: ExecutorSettings,
        decoder: Box<dyn ObjectiveDecoder>,
        observer: Option<Arc<dyn Observer>>,
    ) -> Result<Self> {
        let layout = ProjectLayout::new(root, &settings.prefix);

        let input = layout.input_file();
        let options = if input.is_file() {
            Some(read_input_file(&input)?)
        } else {
            debug!(path = %input.display(), "no input file yet");
            None
        };
        let status = infer_from_output(&layout.output_file())?;
        info!(root = %layout.root().display(), %status, "opened project");

        let hub = Arc::new(ObserverHub::new());
        if let Some(observer) = observer {
            hub.register(observer);
        }

        let executor = Self {
            shared: Arc::new(Shared {
                layout,
                settings,
                status: StatusTracker::new(status, Arc::clone(&hub)),
                hub,
                decoder,
                options: RwLock::new(options),
                work_queue: Mutex::new(WorkQueueSnapshot::default()),
                history: Mutex::new(IterationStore::new()),
                child: Mutex::new(None),
                run_info: Mutex::new(RunInfo::default()),
                catch_up: Mutex::new(None),
                killed: AtomicBool::new(false),
                op_lock: Mutex::new(()),
            }),
        };
        executor.start_catch_up();
        Ok(executor)
    }

    fn start_catch_up(&self) {
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("fbexec-catch-up".to_string())
            .spawn(move || catch_up(&shared));
        match spawned {
            Ok(handle) => *lock(&self.shared.catch_up) = Some(handle),
            Err(e) => warn!(error = %e, "could not start history scan"),
        }
    }

    /// Block until the catch-up scan started by `open` has finished.
    pub fn wait_for_history(&self) {
        let handle = lock(&self.shared.catch_up).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("history scan panicked");
            }
        }
    }

    /// Replace the observer.
    pub fn register_observer(&self, observer: Arc<dyn Observer>) {
        self.shared.hub.register(observer);
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.shared.layout
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.shared.settings
    }

    pub fn status(&self) -> ExecutionStatus {
        self.shared.status.get()
    }

    pub fn work_queue(&self) -> WorkQueueSnapshot {
        *self.shared.lock_work_queue()
    }

    /// Snapshot of both histories.
    pub fn history(&self) -> IterationStore {
        self.shared.lock_history().clone()
    }

    pub fn objective_totals(&self) -> BTreeMap<usize, f64> {
        self.shared.lock_history().objective_totals()
    }

    pub fn run_info(&self) -> RunInfo {
        lock(&self.shared.run_info).clone()
    }

    pub fn options(&self) -> Option<InputOptions> {
        self.shared
            .options
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the option tree held in memory. Call `write_input_file` to persist it.
    pub fn set_options(&self, options: InputOptions) {
        *self
            .shared
            .options
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(options);
    }

    /// Overlay options onto the in-memory tree, starting from an empty tree if none is loaded.
    pub fn update_options(
        &self,
        general: GeneralOptions,
        priors: BTreeMap<String, f64>,
        targets: Vec<TargetOptions>,
    ) {
        let mut slot = self
            .shared
            .options
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.get_or_insert_with(InputOptions::default)
            .merge(general, priors, targets);
    }

    /// Persist the in-memory option tree to the project's input file.
    pub fn write_input_file(&self) -> Result<()> {
        let options = self
            .options()
            .ok_or_else(|| ExecError::Precondition("no input options to write".to_string()))?;
        write_input_file(
            &self.shared.layout.input_file(),
            &options,
            &self.shared.settings.checkpoint_file,
        )
    }

    /// Re-inspect the output file and reassign the status from it.
    pub fn refresh_status(&self) -> Result<ExecutionStatus> {
        let status = infer_from_output(&self.shared.layout.output_file())?;
        self.shared.status.set(status);
        Ok(status)
    }

    /// Comparison details of `target` at `iteration`. Problems are reported in the result.
    pub fn objective_detail(&self, target: &str, iteration: usize) -> ObjectiveDetail {
        match self.options() {
            Some(options) => objective_detail(&self.shared.layout, &options, target, iteration),
            None => ObjectiveDetail {
                error: Some("no input options loaded".to_string()),
                ..Default::default()
            },
        }
    }

    /// Launch the optimizer on the persisted input file and monitor it.
    ///
    /// Returns once the optimizer printed a terminal line or exited. The input file is re-read
    /// first, so edits made on disk take effect.
    ///
    /// # Returns
    /// The status when monitoring ended.
    ///
    /// # Errors
    /// * `ExecError::Precondition` - no input file, or the previous child is still running
    /// * `ExecError::MissingArtifact` / `ExecError::Consistency` - the optimizer announced an
    ///   iteration it did not fully write
    pub fn run(&self) -> Result<ExecutionStatus> {
        let (output, capture) = {
            let _guard = self.shared.lock_ops();
            self.launch()?
        };
        self.monitor(output, capture)?;
        Ok(self.status())
    }

    fn launch(&self) -> Result<(File, Option<File>)> {
        let layout = &self.shared.layout;
        let input = layout.input_file();
        if !input.is_file() {
            return Err(ExecError::Precondition(format!(
                "input file {} does not exist",
                input.display()
            )));
        }

        // Observers re-query the executor from inside notifications, so no internal guard may
        // be held past this check. The op lock keeps the child slot ours until it is refilled.
        if let Some(child) = lock(&self.shared.child).as_mut() {
            if !process::has_exited(child) {
                return Err(ExecError::Precondition(format!(
                    "optimizer is still running (pid {})",
                    child.id()
                )));
            }
        }

        let options = read_input_file(&input)?;
        self.set_options(options);

        self.shared.status.set(ExecutionStatus::Running);
        self.shared.lock_history().clear();
        *self.shared.lock_work_queue() = WorkQueueSnapshot::default();
        self.shared.hub.notify(Event::IterUpdate);

        let capture = if self.shared.settings.capture_output {
            let path = layout.output_file();
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .map_err(|e| ExecError::io(&path, e))?;
            Some(file)
        } else {
            None
        };

        let program = PathBuf::from(&self.shared.settings.program);
        let input_name = layout.input_file_name();
        let (child, output) =
            match process::spawn_merged(&program, &[input_name.as_str()], layout.root()) {
                Ok(spawned) => spawned,
                Err(e) => {
                    self.shared.status.set(ExecutionStatus::Error);
                    return Err(e);
                }
            };

        let pid = child.id();
        *lock(&self.shared.child) = Some(child);
        self.shared.killed.store(false, Ordering::SeqCst);
        *lock(&self.shared.run_info) = RunInfo {
            started_at: Some(Utc::now()),
            pid: Some(pid),
            ever_spawned: true,
        };
        info!(pid, program = %program.display(), input = %input_name, "optimizer started");
        Ok((output, capture))
    }

    /// Whether the optimizer launched by the last `run` is still alive.
    pub fn child_running(&self) -> bool {
        !self.child_exited()
    }

    /// Whether the child is gone. A never-spawned child counts as gone.
    pub(super) fn child_exited(&self) -> bool {
        match lock(&self.shared.child).as_mut() {
            Some(child) => process::has_exited(child),
            None => true,
        }
    }

    /// Forcibly stop the optimizer and reset the status to idle.
    ///
    /// Does nothing if the optimizer was never launched by this executor.
    pub fn kill(&self) -> Result<()> {
        let _guard = self.shared.lock_ops();
        if !lock(&self.shared.run_info).ever_spawned {
            debug!("kill requested but nothing was ever spawned");
            return Ok(());
        }

        self.shared.mark_killed();
        if let Some(child) = lock(&self.shared.child).as_mut() {
            process::terminate(child)?;
            info!(pid = child.id(), "optimizer killed");
        }
        self.shared.status.set(ExecutionStatus::Idle);
        Ok(())
    }

    /// Remove every output of previous runs and empty the histories.
    ///
    /// # Returns
    /// The paths that were removed.
    pub fn clean_up(&self) -> Result<Vec<PathBuf>> {
        let _guard = self.shared.lock_ops();
        let removed = self.shared.layout.clean()?;
        self.shared.lock_history().clear();
        info!(removed = removed.len(), "cleaned project outputs");
        self.shared.hub.notify(Event::IterUpdate);
        Ok(removed)
    }
}

/// Body of the background history scan.
fn catch_up(shared: &Shared) {
    {
        let _guard = shared.lock_ops();
        if lock(&shared.run_info).ever_spawned {
            debug!("run already started, skipping history scan");
            return;
        }

        let options = shared
            .options
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        let Some(options) = options else {
            debug!("no input options, nothing to scan");
            return;
        };

        let mut scanned = IterationStore::new();
        match scanned.catch_up(&shared.layout, &options, shared.decoder.as_ref()) {
            Ok(()) => *shared.lock_history() = scanned,
            Err(e) => {
                warn!(error = %e, "history scan failed");
                return;
            }
        }
    }

    shared.hub.notify(Event::IterUpdate);
    shared.hub.notify(Event::StatusUpdate);
}
