//! Runs of the executor against scripted optimizers.

use serial_test::serial;
use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use fbexec::history::JsonObjectiveDecoder;
use fbexec::models::{ExecutionStatus, WorkQueueSnapshot};
use fbexec::observer::{ChannelObserver, Event};
use fbexec::{ExecError, Executor};

use super::{settings_for, write_script, INPUT};

/// Project folder with an input file, plus a separate folder for the script.
fn project(script_body: &str) -> (TempDir, TempDir, Executor) {
    let root = TempDir::new().unwrap();
    let bin = TempDir::new().unwrap();
    fs::write(root.path().join("fb.in"), INPUT).unwrap();
    let script = write_script(bin.path(), script_body);
    let executor = Executor::open(root.path(), settings_for(&script)).unwrap();
    executor.wait_for_history();
    (root, bin, executor)
}

#[test]
#[serial]
fn test_converged_run_records_every_iteration() {
    let body = r#"
test "$1" = "fb.in" || { echo "unexpected argument $1"; exit 1; }
for i in 0 1; do
    write_iteration $i
    echo "2/4 workers busy, $i/2 jobs complete"
    echo "Writing the checkpoint file checkpoint.p"
done
echo "Calculation Finished."
echo "trailing output"
"#;
    let root = TempDir::new().unwrap();
    let bin = TempDir::new().unwrap();
    fs::write(root.path().join("fb.in"), INPUT).unwrap();
    let script = write_script(bin.path(), body);
    let (tx, rx) = mpsc::channel();
    let executor = Executor::open_with(
        root.path(),
        settings_for(&script),
        Box::new(JsonObjectiveDecoder),
        Some(Arc::new(ChannelObserver::new(tx))),
    )
    .unwrap();
    executor.wait_for_history();

    let status = executor.run().unwrap();

    assert_eq!(status, ExecutionStatus::Finished { converged: true });
    let history = executor.history();
    assert_eq!(history.objectives().len(), 2);
    assert_eq!(history.parameters().len(), 2);
    assert_eq!(history.objectives()[&1].len(), 2);
    assert_eq!(history.parameters()[&1], vec![0.1, 1.0]);
    assert_eq!(
        executor.work_queue(),
        WorkQueueSnapshot {
            workers_busy: 2,
            workers_total: 4,
            jobs_done: 1,
            jobs_total: 2,
        }
    );

    let events: Vec<Event> = rx.try_iter().collect();
    assert_eq!(events.iter().filter(|e| **e == Event::WorkQueueUpdate).count(), 2);
    assert!(events.iter().filter(|e| **e == Event::IterUpdate).count() >= 2);
    assert_eq!(events.last(), Some(&Event::StatusUpdate));

    let captured = fs::read_to_string(root.path().join("fb.out")).unwrap();
    assert!(captured.contains("Calculation Finished."));
    assert!(executor.run_info().ever_spawned);
    assert!(executor.run_info().started_at.is_some());
}

#[test]
#[serial]
fn test_observer_can_query_executor_during_run() {
    let (_root, _bin, executor) = project(
        r#"
write_iteration 0
echo "1/2 workers busy, 0/1 jobs complete"
echo "Writing the checkpoint file checkpoint.p"
echo "Calculation Finished."
"#,
    );
    let (seen_tx, seen_rx) = mpsc::channel();
    let seen_tx = std::sync::Mutex::new(seen_tx);
    let querying = executor.clone();
    executor.register_observer(Arc::new(move |event: Event| {
        let snapshot = (
            event,
            querying.child_running(),
            querying.status(),
            querying.history().len(),
            querying.work_queue(),
        );
        let _ = seen_tx.lock().unwrap().send(snapshot);
    }));

    let (done_tx, done_rx) = mpsc::channel();
    let running = executor.clone();
    thread::spawn(move || {
        let _ = done_tx.send(running.run());
    });

    let status = done_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("run blocked while the observer queried the executor")
        .unwrap();
    executor.register_observer(Arc::new(|_: Event| {}));

    assert_eq!(status, ExecutionStatus::Finished { converged: true });
    let seen: Vec<_> = seen_rx.try_iter().collect();
    assert!(seen
        .iter()
        .any(|(event, _, status, _, _)| *event == Event::StatusUpdate
            && *status == ExecutionStatus::Running));
    assert!(seen
        .iter()
        .any(|(event, _, _, iterations, _)| *event == Event::IterUpdate && *iterations == 1));
}

#[test]
#[serial]
fn test_step_budget_finishes_not_converged() {
    let (_root, _bin, executor) = project(
        r#"
write_iteration 0
echo "Writing the checkpoint file checkpoint.p"
echo "Maximum number of optimization steps reached (1)"
"#,
    );

    let status = executor.run().unwrap();

    assert_eq!(status, ExecutionStatus::Finished { converged: false });
    assert_eq!(executor.history().len(), 1);
}

#[test]
#[serial]
fn test_error_line_does_not_stop_monitoring() {
    let (_root, _bin, executor) = project(
        r#"
echo "worker reported an error, retrying"
write_iteration 0
echo "Writing the checkpoint file checkpoint.p"
echo "Calculation Finished."
"#,
    );

    let status = executor.run().unwrap();

    assert_eq!(status, ExecutionStatus::Finished { converged: true });
    assert_eq!(executor.history().len(), 1);
}

#[test]
#[serial]
fn test_error_without_terminal_marker_stays_error() {
    let (root, _bin, executor) = project(r#"echo "fatal error: cannot read water.itp" 1>&2"#);

    let status = executor.run().unwrap();

    assert_eq!(status, ExecutionStatus::Error);
    // The merged stderr line was captured and infers the same status later.
    assert_eq!(
        fbexec::executor::infer_from_output(&root.path().join("fb.out")).unwrap(),
        ExecutionStatus::Error
    );
}

#[test]
#[serial]
fn test_checkpoint_without_artifacts_is_fatal() {
    let (_root, _bin, executor) = project(
        r#"
echo "Writing the checkpoint file checkpoint.p"
echo "Calculation Finished."
"#,
    );

    let err = executor.run().unwrap_err();

    assert!(matches!(err, ExecError::MissingArtifact { .. }));
    assert_eq!(executor.status(), ExecutionStatus::Error);
    assert!(executor.history().is_empty());
}

#[test]
#[serial]
fn test_run_waits_for_child_after_output_closes() {
    let (_root, _bin, executor) = project(
        r#"
echo "1/2 workers busy, 0/3 jobs complete"
exec 1>&- 2>&-
sleep 0.3
"#,
    );

    let started = Instant::now();
    let status = executor.run().unwrap();

    assert!(started.elapsed() >= Duration::from_millis(250));
    assert_eq!(status, ExecutionStatus::Running);
    assert_eq!(executor.work_queue().jobs_total, 3);
}

#[test]
#[serial]
fn test_run_without_input_is_precondition_failure() {
    let root = TempDir::new().unwrap();
    let bin = TempDir::new().unwrap();
    let script = write_script(bin.path(), "echo never");
    let executor = Executor::open(root.path(), settings_for(&script)).unwrap();

    assert!(matches!(executor.run(), Err(ExecError::Precondition(_))));
    assert_eq!(executor.status(), ExecutionStatus::Idle);
    assert!(!executor.run_info().ever_spawned);
}

#[test]
#[serial]
fn test_kill_without_child_is_noop() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("fb.in"), INPUT).unwrap();
    fs::write(root.path().join("fb.out"), "Calculation Finished.\n").unwrap();
    let executor = Executor::open(root.path(), settings_for(Path::new("/bin/true"))).unwrap();

    executor.kill().unwrap();

    assert_eq!(
        executor.status(),
        ExecutionStatus::Finished { converged: true }
    );
}

#[test]
#[serial]
fn test_kill_stops_running_optimizer() {
    let (_root, _bin, executor) = project(
        r#"
echo "started"
exec sleep 30
"#,
    );

    let runner = executor.clone();
    let handle = thread::spawn(move || runner.run());

    let deadline = Instant::now() + Duration::from_secs(5);
    while !executor.run_info().ever_spawned && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(executor.status(), ExecutionStatus::Running);

    executor.kill().unwrap();
    let status = handle.join().unwrap().unwrap();

    assert_eq!(status, ExecutionStatus::Idle);
    assert_eq!(executor.status(), ExecutionStatus::Idle);
}

#[test]
#[serial]
fn test_second_run_clears_history_and_restarts_indices() {
    let (_root, _bin, executor) = project(
        r#"
write_iteration 0
echo "Writing the checkpoint file checkpoint.p"
echo "Calculation Finished."
"#,
    );

    executor.run().unwrap();
    assert_eq!(executor.history().len(), 1);
    // The previous child has exited, so a new run is accepted and starts from iteration 0.
    wait_for_exit(&executor);
    executor.run().unwrap();
    assert_eq!(executor.history().len(), 1);
}

#[test]
#[serial]
fn test_reopened_project_recovers_previous_run() {
    let (root, bin, executor) = project(
        r#"
for i in 0 1 2; do
    write_iteration $i
    echo "Writing the checkpoint file checkpoint.p"
done
echo "Maximum number of optimization steps reached"
echo "I have not failed."
"#,
    );
    executor.run().unwrap();
    wait_for_exit(&executor);

    let script = bin.path().join("fake-forcebalance.sh");
    let reopened = Executor::open(root.path(), settings_for(&script)).unwrap();
    reopened.wait_for_history();

    assert_eq!(
        reopened.status(),
        ExecutionStatus::Finished { converged: false }
    );
    assert_eq!(reopened.history().len(), 3);
    assert_eq!(reopened.history(), executor.history());
}

/// Let the child finish after a terminal line.
fn wait_for_exit(executor: &Executor) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while executor.child_running() {
        assert!(Instant::now() < deadline, "optimizer did not exit");
        thread::sleep(Duration::from_millis(20));
    }
}
