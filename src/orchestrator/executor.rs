//! Benchmark worker: the timing loop that runs on its own thread.
//!
//! The worker owns its inputs and timing buffers. The only state it shares
//! with the owner is the stop flag, checked before every sample, so a stop
//! request is honoured within one sample. Every message goes through one
//! channel in emission order and `Finished` is always the last message of a
//! run.

use crate::models::StopReason;
use crate::error::RunError;
use crate::suites::{generate_input, BenchmarkSuite};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Message from a worker to the owner, tagged with the run it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    Started {
        run_id: u64,
        benchmark: String,
        size: usize,
    },
    Measured {
        run_id: u64,
        benchmark: String,
        size: usize,
        elapsed: Duration,
    },
    Finished {
        run_id: u64,
        reason: StopReason,
    },
}

impl WorkerMessage {
    pub fn run_id(&self) -> u64 {
        match self {
            WorkerMessage::Started { run_id, .. }
            | WorkerMessage::Measured { run_id, .. }
            | WorkerMessage::Finished { run_id, .. } => *run_id,
        }
    }
}

/// Parameters frozen at `start()`. A run never sees later changes.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub run_id: u64,
    pub suite: Arc<BenchmarkSuite>,
    /// Benchmark titles in suite order.
    pub benchmarks: Vec<String>,
    /// Input sizes, ascending.
    pub sizes: Vec<usize>,
    pub randomized: bool,
    pub samples_per_size: usize,
    pub seed: Option<u64>,
}

/// Spawn the worker thread for one run.
pub fn spawn_worker(
    params: RunParams,
    stop_flag: Arc<AtomicBool>,
    tx: UnboundedSender<WorkerMessage>,
) -> Result<JoinHandle<()>, RunError> {
    let name = format!("bench-run-{}", params.run_id);
    thread::Builder::new()
        .name(name)
        .spawn(move || {
            let run_id = params.run_id;
            let reason = run_loop(&params, &stop_flag, &tx);
            log::info!(
                "[Worker] Run {} ({}) finished: {}",
                run_id,
                params.suite.title(),
                reason
            );
            let _ = tx.send(WorkerMessage::Finished { run_id, reason });
        })
        .map_err(|e| RunError::WorkerSpawn(e.to_string()))
}

/// One pass over every (benchmark, size) pair: benchmarks outer, sizes inner.
fn run_loop(
    params: &RunParams,
    stop_flag: &AtomicBool,
    tx: &UnboundedSender<WorkerMessage>,
) -> StopReason {
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let run_id = params.run_id;

    for title in &params.benchmarks {
        let Some(bench) = params.suite.benchmark(title) else {
            log::warn!("[Worker] Benchmark '{}' vanished from suite, skipping", title);
            continue;
        };

        for &size in &params.sizes {
            if stop_flag.load(Ordering::Acquire) {
                return StopReason::Cancelled;
            }
            let started = WorkerMessage::Started {
                run_id,
                benchmark: title.clone(),
                size,
            };
            if tx.send(started).is_err() {
                // Owner is gone; nobody is listening any more.
                return StopReason::Cancelled;
            }

            for sample in 0..params.samples_per_size {
                if sample > 0 && stop_flag.load(Ordering::Acquire) {
                    return StopReason::Cancelled;
                }
                let input = generate_input(size, params.randomized, &mut rng);
                let outcome = catch_unwind(AssertUnwindSafe(|| bench.run(&input)));

                let elapsed = match outcome {
                    Ok(Ok(elapsed)) => elapsed,
                    Ok(Err(reason)) => {
                        let err = RunError::FatalMeasurement {
                            benchmark: title.clone(),
                            size,
                            reason,
                        };
                        log::error!("[Worker] {}", err);
                        return StopReason::Failed(err.to_string());
                    }
                    Err(_) => {
                        let err = RunError::Panicked {
                            benchmark: title.clone(),
                            size,
                        };
                        log::error!("[Worker] {}", err);
                        return StopReason::Failed(err.to_string());
                    }
                };

                let measured = WorkerMessage::Measured {
                    run_id,
                    benchmark: title.clone(),
                    size,
                    elapsed,
                };
                if tx.send(measured).is_err() {
                    return StopReason::Cancelled;
                }
            }
        }
    }

    StopReason::Completed
}
