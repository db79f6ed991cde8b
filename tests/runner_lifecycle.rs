//! Run state machine lifecycle through the public Runner API.

use collection_bench::models::{BenchmarkSelection, MeasurementEvent, ScaleRange, StopReason};
use collection_bench::orchestrator::{RunState, Runner, RunnerConfig, RunnerEvents};
use collection_bench::models::MAX_SCALE;
use collection_bench::results::{JsonResultsStore, MemoryResultsStore};
use collection_bench::suites::BenchmarkSuite;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn selection(min: u32, max: u32) -> BenchmarkSelection {
    BenchmarkSelection {
        scale_range: ScaleRange::new(min, max),
        ..Default::default()
    }
}

fn runner_for(suite: BenchmarkSuite, min: u32, max: u32) -> (Runner, RunnerEvents) {
    let title = suite.title().to_string();
    let suites = vec![Arc::new(suite)];
    let store = MemoryResultsStore::new().with_selection(&title, selection(min, max));
    Runner::new(&suites, Box::new(store), RunnerConfig::default())
}

fn sleepy(ms: u64) -> impl Fn(&[u64], &mut collection_bench::suites::Timer) -> Result<(), String> + Send + Sync {
    move |_, _| {
        std::thread::sleep(Duration::from_millis(ms));
        Ok(())
    }
}

/// Pump worker messages into the runner until `until` matches or time runs out.
fn pump(
    runner: &mut Runner,
    events: &mut RunnerEvents,
    mut until: impl FnMut(&MeasurementEvent) -> bool,
) -> Vec<MeasurementEvent> {
    let deadline = Instant::now() + Duration::from_secs(20);
    let mut out = Vec::new();
    while Instant::now() < deadline {
        match events.try_recv() {
            Some(msg) => {
                if let Some(event) = runner.process(msg) {
                    let done = until(&event);
                    out.push(event);
                    if done {
                        return out;
                    }
                }
            }
            None => std::thread::sleep(Duration::from_millis(1)),
        }
    }
    panic!("timed out, got {:?}", out);
}

fn is_stopped(event: &MeasurementEvent) -> bool {
    matches!(event, MeasurementEvent::Stopped { .. })
}

#[test]
fn test_notification_sequence_for_two_benchmarks_two_sizes() {
    let suite = BenchmarkSuite::new("Set")
        .with_benchmark("Insert", |_, _| Ok(()))
        .with_benchmark("Remove", |_, _| Ok(()));
    let (mut runner, mut events) = runner_for(suite, 4, 5);

    assert!(runner.start("Set", false));
    let events = pump(&mut runner, &mut events, is_stopped);

    let shape: Vec<String> = events
        .iter()
        .map(|e| match e {
            MeasurementEvent::Started { benchmark, size, .. } => format!("started({},{})", benchmark, size),
            MeasurementEvent::Measured { benchmark, size, .. } => format!("measured({},{})", benchmark, size),
            MeasurementEvent::Stopped { reason, .. } => format!("stopped({})", reason),
        })
        .collect();
    assert_eq!(
        shape,
        vec![
            "started(Insert,16)",
            "measured(Insert,16)",
            "started(Insert,32)",
            "measured(Insert,32)",
            "started(Remove,16)",
            "measured(Remove,16)",
            "started(Remove,32)",
            "measured(Remove,32)",
            "stopped(completed)",
        ]
    );
    assert_eq!(runner.state(), RunState::Idle);
}

#[test]
fn test_measured_sizes_are_non_decreasing_per_benchmark() {
    let suite = BenchmarkSuite::new("Vec")
        .with_benchmark("Push", |_, _| Ok(()))
        .with_benchmark("Sort", |_, _| Ok(()));
    let (mut runner, mut events) = runner_for(suite, 4, 9);
    runner.start("Vec", true);
    let events = pump(&mut runner, &mut events, is_stopped);

    for bench in ["Push", "Sort"] {
        let sizes: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                MeasurementEvent::Measured { benchmark, size, .. } if benchmark == bench => Some(*size),
                _ => None,
            })
            .collect();
        assert_eq!(sizes.len(), 6);
        assert!(sizes.windows(2).all(|w| w[0] <= w[1]), "{:?}", sizes);
    }
}

#[test]
fn test_start_while_running_has_no_effect() {
    let suite = BenchmarkSuite::new("Set").with_benchmark("Insert", sleepy(5));
    let (mut runner, mut events) = runner_for(suite, 4, 6);

    assert!(runner.start("Set", false));
    assert!(!runner.start("Set", true));
    assert_eq!(runner.state(), RunState::Running);

    let events = pump(&mut runner, &mut events, is_stopped);
    assert_eq!(events.iter().filter(|e| is_stopped(e)).count(), 1);
    assert_eq!(
        events.iter().filter(|e| matches!(e, MeasurementEvent::Started { .. })).count(),
        3
    );
}

#[test]
fn test_stop_twice_yields_one_stopped_and_nothing_after() {
    let suite = BenchmarkSuite::new("Set").with_benchmark("Insert", sleepy(10));
    let (mut runner, mut events) = runner_for(suite, 4, 12);

    runner.start("Set", false);
    pump(&mut runner, &mut events, |e| matches!(e, MeasurementEvent::Measured { .. }));

    assert!(runner.stop());
    assert!(!runner.stop());
    assert_eq!(runner.state(), RunState::Stopping);

    let tail = pump(&mut runner, &mut events, is_stopped);
    assert_eq!(
        tail.last(),
        Some(&MeasurementEvent::Stopped {
            suite: "Set".to_string(),
            reason: StopReason::Cancelled
        })
    );
    assert_eq!(runner.state(), RunState::Idle);

    std::thread::sleep(Duration::from_millis(50));
    assert!(events.try_recv().is_none());
}

#[test]
fn test_failing_benchmark_stops_abnormally_without_retry() {
    let suite = BenchmarkSuite::new("Set")
        .with_benchmark("Lookup", |input, _| {
            if input.len() >= 32 {
                Err("missing key".to_string())
            } else {
                Ok(())
            }
        })
        .with_benchmark("Insert", |_, _| Ok(()));
    let (mut runner, mut events) = runner_for(suite, 4, 6);

    runner.start("Set", false);
    let events = pump(&mut runner, &mut events, is_stopped);

    match events.last() {
        Some(MeasurementEvent::Stopped { reason, .. }) => assert!(reason.is_abnormal()),
        other => panic!("unexpected {:?}", other),
    }
    assert!(!events
        .iter()
        .any(|e| matches!(e, MeasurementEvent::Started { benchmark, .. } if benchmark == "Insert")));
    assert_eq!(runner.state(), RunState::Idle);
    assert_eq!(runner.results("Set").sample_count(), 1);
}

#[test]
fn test_empty_selection_runs_every_benchmark_and_toggle_narrows_it() {
    let suite = BenchmarkSuite::new("Set")
        .with_benchmark("Insert", |_, _| Ok(()))
        .with_benchmark("Remove", |_, _| Ok(()));
    let titles = suite.benchmark_titles();
    let (mut runner, mut events) = runner_for(suite, 4, 4);

    runner.results_mut("Set").selection.toggle("Remove", &titles);
    runner.start("Set", false);
    let events = pump(&mut runner, &mut events, is_stopped);

    let started: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            MeasurementEvent::Started { benchmark, .. } => Some(benchmark.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec!["Insert"]);
}

#[test]
fn test_dropping_a_running_runner_joins_the_worker() {
    let suite = BenchmarkSuite::new("Set").with_benchmark("Insert", sleepy(5));
    let (mut runner, _events) = runner_for(suite, 4, 20);
    runner.start("Set", false);

    let started = Instant::now();
    drop(runner);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_out_of_range_persisted_scale_is_clamped_before_a_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.json");
    std::fs::write(
        &path,
        r#"{"version":1,"suites":{"Set":{"selection":{"scale_range":{"min":0,"max":64}}}}}"#,
    )
    .unwrap();

    let store = JsonResultsStore::load(&path);
    let suites = vec![Arc::new(BenchmarkSuite::new("Set").with_benchmark("Insert", |_, _| Ok(())))];
    let (mut runner, mut events) = Runner::new(&suites, Box::new(store), RunnerConfig::default());
    assert_eq!(runner.results("Set").selection.scale_range.max, MAX_SCALE);

    assert!(runner.start("Set", false));
    assert!(runner.stop());
    let events = pump(&mut runner, &mut events, is_stopped);

    assert!(events.iter().all(|e| match e {
        MeasurementEvent::Started { size, .. } | MeasurementEvent::Measured { size, .. } => {
            *size <= 1 << MAX_SCALE
        }
        MeasurementEvent::Stopped { .. } => true,
    }));
    assert_eq!(runner.state(), RunState::Idle);
}
