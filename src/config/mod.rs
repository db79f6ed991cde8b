//! Configuration module for the benchmark runner.
//!
//! # Module Structure
//!
//! - `loader`: `BenchConfig` (TOML) with refresh intervals, sample counts and
//!   file locations
//!
//! # Settings Management
//!
//! The `SettingsManager` provides thread-safe access to `AppSettings`:
//! - Uses `Arc<RwLock<AppSettings>>` for parallel reads
//! - Persists state to a JSON file on every change
//! - Notifies a single subscriber of changes that affect the controller
//!   (amortized chart mode, randomized inputs)

pub mod loader;

pub use loader::BenchConfig;

use crate::error::ConfigError;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// User-facing settings persisted between sessions.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Chart time per element instead of total time.
    pub amortized: bool,
    /// Feed benchmarks shuffled inputs.
    pub randomize_inputs: bool,
    /// Title of the last selected suite.
    pub selected_suite: Option<String>,
}

/// A settings change the controller reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingChange {
    Amortized(bool),
    RandomizeInputs(bool),
}

/// Cloneable handle over the shared settings.
#[derive(Clone)]
pub struct SettingsManager {
    state: Arc<RwLock<AppSettings>>,
    path: Option<PathBuf>,
    subscriber: Arc<Mutex<Option<UnboundedSender<SettingChange>>>>,
}

impl SettingsManager {
    /// Load settings from `path`, or return defaults if the file is missing.
    ///
    /// ERROR HANDLING: a file that fails to parse is logged and replaced by
    /// defaults instead of aborting startup.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<AppSettings>(&content) {
                Ok(state) => state,
                Err(e) => {
                    log::warn!(
                        "[Config] Failed to parse {}, falling back to defaults: {}",
                        path.display(),
                        e
                    );
                    AppSettings::default()
                }
            },
            Err(_) => AppSettings::default(),
        };
        Self::with_state(state, Some(path))
    }

    /// Settings that are never written to disk.
    pub fn in_memory(state: AppSettings) -> Self {
        Self::with_state(state, None)
    }

    fn with_state(state: AppSettings, path: Option<PathBuf>) -> Self {
        SettingsManager {
            state: Arc::new(RwLock::new(state)),
            path,
            subscriber: Arc::new(Mutex::new(None)),
        }
    }

    /// Register the change subscriber. A later call replaces the earlier one.
    pub fn subscribe(&self) -> UnboundedReceiver<SettingChange> {
        let (tx, rx) = unbounded_channel();
        if let Ok(mut slot) = self.subscriber.lock() {
            *slot = Some(tx);
        }
        rx
    }

    pub fn snapshot(&self) -> AppSettings {
        self.state.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn amortized(&self) -> bool {
        self.state.read().map(|s| s.amortized).unwrap_or_default()
    }

    pub fn randomize_inputs(&self) -> bool {
        self.state.read().map(|s| s.randomize_inputs).unwrap_or_default()
    }

    pub fn selected_suite(&self) -> Option<String> {
        self.state.read().ok().and_then(|s| s.selected_suite.clone())
    }

    pub fn set_amortized(&self, value: bool) {
        let changed = self.update(|s| std::mem::replace(&mut s.amortized, value) != value);
        if changed {
            self.notify(SettingChange::Amortized(value));
        }
    }

    pub fn set_randomize_inputs(&self, value: bool) {
        let changed = self.update(|s| std::mem::replace(&mut s.randomize_inputs, value) != value);
        if changed {
            self.notify(SettingChange::RandomizeInputs(value));
        }
    }

    pub fn set_selected_suite(&self, title: &str) {
        self.update(|s| {
            let changed = s.selected_suite.as_deref() != Some(title);
            s.selected_suite = Some(title.to_string());
            changed
        });
    }

    /// Persist the current settings. No-op for in-memory settings.
    pub fn save(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `f`; persist when it reports a change. Persistence failures are
    /// logged and swallowed.
    fn update(&self, f: impl FnOnce(&mut AppSettings) -> bool) -> bool {
        let changed = match self.state.write() {
            Ok(mut state) => f(&mut state),
            Err(e) => {
                log::error!("[Config] Settings lock poisoned: {}", e);
                return false;
            }
        };
        if changed {
            if let Err(e) = self.save() {
                log::warn!("[Config] Failed to persist settings: {}", e);
            }
        }
        changed
    }

    fn notify(&self, change: SettingChange) {
        if let Ok(slot) = self.subscriber.lock() {
            if let Some(tx) = slot.as_ref() {
                let _ = tx.send(change);
            }
        }
    }
}
