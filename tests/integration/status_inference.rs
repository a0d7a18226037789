//! Status inferred from the output file of a previous run.

use std::fs;
use std::sync::mpsc;
use std::sync::Arc;
use tempfile::TempDir;

use fbexec::history::JsonObjectiveDecoder;
use fbexec::models::ExecutionStatus;
use fbexec::observer::{ChannelObserver, Event};
use fbexec::{Executor, ExecutorSettings};

use super::TWO_TARGET_INPUT;

fn open_with_output(output: Option<&str>) -> (TempDir, Executor) {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("fb.in"), TWO_TARGET_INPUT).unwrap();
    if let Some(content) = output {
        fs::write(temp.path().join("fb.out"), content).unwrap();
    }
    let executor = Executor::open(temp.path(), ExecutorSettings::default()).unwrap();
    (temp, executor)
}

#[test]
fn test_absent_output_is_idle() {
    let (_temp, executor) = open_with_output(None);
    assert_eq!(executor.status(), ExecutionStatus::Idle);
}

#[test]
fn test_completion_marker_is_converged() {
    let (_temp, executor) = open_with_output(Some("Iteration 4\nCalculation Finished.\n"));
    assert_eq!(
        executor.status(),
        ExecutionStatus::Finished { converged: true }
    );
}

#[test]
fn test_not_failed_marker_is_not_converged() {
    let (_temp, executor) = open_with_output(Some(
        "Maximum number of optimization steps reached (5)\nI have not failed.\n",
    ));
    assert_eq!(
        executor.status(),
        ExecutionStatus::Finished { converged: false }
    );
}

#[test]
fn test_no_marker_is_error() {
    let (_temp, executor) = open_with_output(Some("Iteration 2\nKilled\n"));
    assert_eq!(executor.status(), ExecutionStatus::Error);
}

#[test]
fn test_refresh_status_reinspects_output() {
    let (temp, executor) = open_with_output(None);
    let (tx, rx) = mpsc::channel();
    executor.register_observer(Arc::new(ChannelObserver::new(tx)));
    executor.wait_for_history();
    rx.try_iter().for_each(drop);

    fs::write(temp.path().join("fb.out"), "Calculation Finished.\n").unwrap();
    let status = executor.refresh_status().unwrap();

    assert_eq!(status, ExecutionStatus::Finished { converged: true });
    assert_eq!(executor.status(), status);
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Event::StatusUpdate]);
}

#[test]
fn test_observer_hears_about_finished_scan() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("fb.in"), TWO_TARGET_INPUT).unwrap();
    let (tx, rx) = mpsc::channel();

    let executor = Executor::open_with(
        temp.path(),
        ExecutorSettings::default(),
        Box::new(JsonObjectiveDecoder),
        Some(Arc::new(ChannelObserver::new(tx))),
    )
    .unwrap();
    executor.wait_for_history();

    assert_eq!(
        rx.try_iter().collect::<Vec<_>>(),
        vec![Event::IterUpdate, Event::StatusUpdate]
    );
}

#[test]
fn test_malformed_input_fails_open() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("fb.in"), "$options\nbogus_key 1\n$end\n").unwrap();
    assert!(Executor::open(temp.path(), ExecutorSettings::default()).is_err());
}
