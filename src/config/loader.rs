//! Bench config file loader.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the bench config relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/bench.toml";

/// Runner configuration: refresh intervals, sampling and file locations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Minimum interval between status line updates.
    pub progress_interval_ms: u64,
    /// Minimum interval between chart redraws.
    pub chart_interval_ms: u64,
    /// Delay between a measurement and the autosave it schedules.
    pub save_interval_ms: u64,
    /// Samples taken per (benchmark, size) pair in one run.
    pub samples_per_size: usize,
    /// Seed for randomized inputs; a fresh seed per run when absent.
    pub seed: Option<u64>,
    pub settings_path: PathBuf,
    pub results_path: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let base = default_data_dir();
        BenchConfig {
            progress_interval_ms: 100,
            chart_interval_ms: 250,
            save_interval_ms: 30_000,
            samples_per_size: 1,
            seed: None,
            settings_path: base.join("settings.json"),
            results_path: base.join("results.json"),
            log_dir: base.join("logs"),
        }
    }
}

impl BenchConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn chart_interval(&self) -> Duration {
        Duration::from_millis(self.chart_interval_ms)
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_millis(self.save_interval_ms)
    }

    /// Reject values the runner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samples_per_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "samples_per_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Base directory for settings, results and logs: `~/.config/collection-bench`.
pub fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("collection-bench")
}

/// Load config from a TOML file.
pub fn load_config_from_file(path: &Path) -> Result<BenchConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let config: BenchConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, using defaults when the file does not exist.
/// Any other failure (bad TOML, invalid values) is returned.
pub fn load_or_default(path: &Path) -> Result<BenchConfig, ConfigError> {
    match load_config_from_file(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(msg)) => {
            log::info!("[Config] {}; using defaults", msg);
            Ok(BenchConfig::default())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        fs::write(&path, "chart_interval_ms = 100\nseed = 42\n").unwrap();

        let config = load_config_from_file(&path).unwrap();
        assert_eq!(config.chart_interval(), Duration::from_millis(100));
        assert_eq!(config.progress_interval(), Duration::from_millis(100));
        assert_eq!(config.save_interval(), Duration::from_secs(30));
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, BenchConfig::default());
    }

    #[test]
    fn test_zero_samples_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        fs::write(&path, "samples_per_size = 0\n").unwrap();

        assert!(matches!(
            load_or_default(&path),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        fs::write(&path, "chart_interval_ms = \"soon\"\n").unwrap();

        assert!(matches!(load_or_default(&path), Err(ConfigError::InvalidToml(_))));
    }
}
