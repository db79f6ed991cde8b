//! Unified error type hierarchy for the benchmark runner
//!
//! Provides structured error handling with StoreError, ConfigError, RunError
//! and the AppError umbrella.
//!
//! Calling a run operation in the wrong state is not an error: those calls are
//! silent no-ops and never reach this module.

use std::io;
use thiserror::Error;

/// Results store persistence errors.
///
/// Always non-fatal for the run state machine: the controller logs them and
/// keeps going.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error during results persistence: {0}")]
    IoError(#[from] io::Error),

    #[error("Invalid JSON in results document: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Configuration and settings file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid TOML in config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Failures inside a benchmark timing loop.
///
/// A single failing sample aborts the whole run; it is surfaced to the
/// observer as an abnormal stop and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("Benchmark '{benchmark}' failed at size {size}: {reason}")]
    FatalMeasurement {
        benchmark: String,
        size: usize,
        reason: String,
    },

    #[error("Benchmark '{benchmark}' panicked at size {size}")]
    Panicked { benchmark: String, size: usize },

    #[error("Failed to spawn benchmark worker: {0}")]
    WorkerSpawn(String),
}

/// Global error type for the runner binary and library edges.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Results store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Run error: {0}")]
    Run(#[from] RunError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl AppError {
    /// Short message suitable for the status line.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Store(_) => "Could not save results".to_string(),
            AppError::Config(e) => format!("Configuration problem: {}", e),
            AppError::Run(e) => e.to_string(),
            AppError::Io(e) => format!("I/O error: {}", e),
        }
    }
}

/// Convenience result alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;
