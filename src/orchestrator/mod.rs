//! Run orchestration: the benchmark run state machine.
//!
//! **Architecture**:
//! - `state`: `RunState` lifecycle and its transition table
//! - `executor`: the worker thread running a suite's timing loop
//! - `Runner` (this module): owner-side state machine
//!
//! All `Runner` methods are called from one owner (the controller loop). The
//! worker never touches `RunState` or the results store; it only reads its
//! stop flag and reports through [`RunnerEvents`]. The owner feeds each
//! message back into [`Runner::process`], which applies it and yields the
//! observer notification. Because there is exactly one channel and the
//! worker sends `Finished` last, every `Started`/`Measured` of a run is
//! delivered before its `Stopped`.

pub mod executor;
pub mod state;

pub use executor::{RunParams, WorkerMessage};
pub use state::RunState;

use crate::config::BenchConfig;
use crate::error::StoreError;
use crate::models::MeasurementEvent;
use crate::results::{ResultsStore, SuiteResults};
use crate::suites::{BenchmarkSuite, SuiteProvider};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Runner knobs taken from [`BenchConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    pub samples_per_size: usize,
    pub seed: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            samples_per_size: 1,
            seed: None,
        }
    }
}

impl From<&BenchConfig> for RunnerConfig {
    fn from(config: &BenchConfig) -> Self {
        RunnerConfig {
            samples_per_size: config.samples_per_size.max(1),
            seed: config.seed,
        }
    }
}

/// Receiving end of the worker channel, handed to the owner loop.
pub struct RunnerEvents {
    rx: UnboundedReceiver<WorkerMessage>,
}

impl RunnerEvents {
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<WorkerMessage> {
        self.rx.try_recv().ok()
    }
}

struct ActiveRun {
    run_id: u64,
    suite: String,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// The run state machine.
pub struct Runner {
    state: RunState,
    suites: Vec<Arc<BenchmarkSuite>>,
    store: Box<dyn ResultsStore>,
    config: RunnerConfig,
    tx: UnboundedSender<WorkerMessage>,
    active: Option<ActiveRun>,
    next_run_id: u64,
}

impl Runner {
    pub fn new(
        provider: &dyn SuiteProvider,
        store: Box<dyn ResultsStore>,
        config: RunnerConfig,
    ) -> (Self, RunnerEvents) {
        let (tx, rx) = unbounded_channel();
        let suites = provider.suites();
        log::info!("[Runner] Loaded {} suite(s)", suites.len());
        let runner = Runner {
            state: RunState::Idle,
            suites,
            store,
            config,
            tx,
            active: None,
            next_run_id: 1,
        };
        (runner, RunnerEvents { rx })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn suites(&self) -> &[Arc<BenchmarkSuite>] {
        &self.suites
    }

    pub fn suite(&self, title: &str) -> Option<&Arc<BenchmarkSuite>> {
        self.suites.iter().find(|s| s.title() == title)
    }

    /// Results of a suite; an empty default when nothing was recorded yet.
    pub fn results(&self, suite: &str) -> SuiteResults {
        self.store.get(suite).cloned().unwrap_or_default()
    }

    pub fn results_mut(&mut self, suite: &str) -> &mut SuiteResults {
        self.store.results_mut(suite)
    }

    /// Start a run of `suite` if idle. Returns whether a run was launched.
    ///
    /// Parameters (benchmarks, sizes, `randomized`) are frozen here.
    pub fn start(&mut self, suite: &str, randomized: bool) -> bool {
        if self.state != RunState::Idle {
            log::debug!("[Runner] start() ignored in state {}", self.state);
            return false;
        }
        if self.suites.is_empty() {
            log::warn!("[Runner] start() called without any suites loaded");
            return false;
        }
        let Some(suite) = self.suite(suite).cloned() else {
            log::warn!("[Runner] start() called with unknown suite '{}'", suite);
            return false;
        };

        let selection = self.results(suite.title()).selection;
        let benchmarks = selection.effective(&suite.benchmark_titles());
        if benchmarks.is_empty() {
            log::warn!("[Runner] Suite '{}' has no benchmarks", suite.title());
            return false;
        }

        let run_id = self.next_run_id;
        self.next_run_id += 1;
        let params = RunParams {
            run_id,
            suite: Arc::clone(&suite),
            benchmarks,
            sizes: selection.scale_range.sizes(),
            randomized,
            samples_per_size: self.config.samples_per_size,
            seed: self.config.seed,
        };
        log::info!(
            "[Runner] Starting run {} of '{}': {} benchmark(s), {} size(s), randomized={}",
            run_id,
            suite.title(),
            params.benchmarks.len(),
            params.sizes.len(),
            randomized
        );

        let stop_flag = Arc::new(AtomicBool::new(false));
        let handle = match executor::spawn_worker(params, Arc::clone(&stop_flag), self.tx.clone()) {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("[Runner] {}", e);
                return false;
            }
        };

        self.active = Some(ActiveRun {
            run_id,
            suite: suite.title().to_string(),
            stop_flag,
            handle: Some(handle),
        });
        self.transition(RunState::Running);
        true
    }

    /// Ask the running worker to halt at the next sample boundary.
    ///
    /// Returns immediately; the `Idle` transition happens when the worker's
    /// `Finished` message is processed.
    pub fn stop(&mut self) -> bool {
        if self.state != RunState::Running {
            log::debug!("[Runner] stop() ignored in state {}", self.state);
            return false;
        }
        if let Some(active) = &self.active {
            active.stop_flag.store(true, Ordering::Release);
        }
        self.transition(RunState::Stopping);
        true
    }

    /// Clear the samples of every suite. Only legal while idle; returns
    /// `Ok(false)` otherwise.
    pub fn reset(&mut self) -> Result<bool, StoreError> {
        if self.state != RunState::Idle {
            log::debug!("[Runner] reset() ignored in state {}", self.state);
            return Ok(false);
        }
        self.store.reset()?;
        log::info!("[Runner] Results cleared");
        Ok(true)
    }

    pub fn save(&mut self) -> Result<(), StoreError> {
        self.store.save()
    }

    /// Apply a worker message and return the notification for the observer.
    ///
    /// Messages from runs other than the active one are dropped.
    pub fn process(&mut self, msg: WorkerMessage) -> Option<MeasurementEvent> {
        let Some(active) = self.active.as_mut() else {
            log::debug!("[Runner] Dropping message for finished run {}", msg.run_id());
            return None;
        };
        if active.run_id != msg.run_id() {
            log::debug!(
                "[Runner] Dropping message for stale run {} (active {})",
                msg.run_id(),
                active.run_id
            );
            return None;
        }
        let suite = active.suite.clone();

        match msg {
            WorkerMessage::Started { benchmark, size, .. } => Some(MeasurementEvent::Started {
                suite,
                benchmark,
                size,
            }),
            WorkerMessage::Measured {
                benchmark,
                size,
                elapsed,
                ..
            } => {
                self.store.results_mut(&suite).record(&benchmark, size, elapsed);
                Some(MeasurementEvent::Measured {
                    suite,
                    benchmark,
                    size,
                    elapsed,
                })
            }
            WorkerMessage::Finished { reason, .. } => {
                if let Some(handle) = active.handle.take() {
                    if handle.join().is_err() {
                        log::error!("[Runner] Worker thread for '{}' panicked", suite);
                    }
                }
                self.active = None;
                self.transition(RunState::Idle);
                Some(MeasurementEvent::Stopped { suite, reason })
            }
        }
    }

    fn transition(&mut self, next: RunState) {
        if !self.state.can_transition_to(next) {
            log::error!("[Runner] Invalid state transition: {} -> {}", self.state, next);
            return;
        }
        log::debug!("[Runner] {} -> {}", self.state, next);
        self.state = next;
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.stop_flag.store(true, Ordering::Release);
            if let Some(handle) = active.handle {
                let _ = handle.join();
            }
            log::info!(
                "[Runner] Dropped while a run of '{}' was active; worker joined",
                active.suite
            );
        }
    }
}
