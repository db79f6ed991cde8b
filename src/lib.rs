//! Collection Bench
//!
//! Drives collection-performance benchmarks (Vec, VecDeque, BTreeSet,
//! HashSet, ...) across growing input sizes and shows the results as they
//! arrive.
//!
//! **Architecture**: a single owner loop (`ui::controller`) owns the run
//! state machine and a debounced refresh scheduler; benchmark samples are
//! timed on a worker thread that reports back over a channel.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures (selection, scale range, events)
//! - **scheduler**: Debounced refresh coordinator
//! - **suites**: Benchmark definitions and the built-in collection suites
//! - **results**: Per-suite results store (JSON / in-memory)
//! - **render**: Chart rendering seam and text table renderer
//! - **config**: Persisted settings and the bench config file
//! - **orchestrator**: Run state machine and the benchmark worker
//! - **ui**: Controller owner loop, presenter seam and console front end
//! - **log_collector**: Decoupled logging pipeline

// Core foundational modules
pub mod error;
pub mod models;

// Debounced refresh scheduling
pub mod scheduler;

// Benchmark suites and results
pub mod results;
pub mod suites;

// Chart rendering
pub mod render;

// Configuration management module
pub mod config;

// Run state machine and worker
pub mod orchestrator;

// Controller and console front end
pub mod ui;

// Robust, decoupled logging system
pub mod log_collector;

// Re-export the log crate for macro usage
pub use log;

// Re-export log collector for use throughout the system
pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{AppError, ConfigError, Result, RunError, StoreError};

pub use models::{
    BenchmarkSelection, MeasurementEvent, ScaleRange, StopReason, MAX_SCALE, MIN_SCALE,
};

pub use scheduler::{Dispatch, RefreshKind, RefreshPolicy, RefreshScheduler};

pub use suites::{collections::CollectionSuites, Benchmark, BenchmarkSuite, SuiteProvider};

pub use results::{JsonResultsStore, MemoryResultsStore, ResultsStore, SuiteResults};

pub use render::{ChartArtifact, Renderer, TableRenderer};

pub use config::{AppSettings, BenchConfig, SettingChange, SettingsManager};

pub use orchestrator::{RunState, Runner, RunnerConfig, RunnerEvents};

pub use ui::{AppController, Command, ConsolePresenter, Presenter};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
