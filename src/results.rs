//! Results Store
//!
//! Per-suite measurement samples and benchmark selection, keyed by suite title.
//!
//! ## ResultsStore
//! The trait the run state machine and controller talk to. `save()` and
//! `reset()` may fail with a [`StoreError`]; callers treat that as non-fatal.
//!
//! ## JsonResultsStore
//! Persists every suite into a single JSON document, written atomically
//! (temp file + rename). A missing or unreadable document starts empty.
//!
//! ## MemoryResultsStore
//! Volatile store for headless runs and tests.

use crate::error::StoreError;
use crate::models::BenchmarkSelection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Document format version written by [`JsonResultsStore`].
pub const RESULTS_FORMAT_VERSION: u32 = 1;

/// Samples and selection for one suite.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteResults {
    pub selection: BenchmarkSelection,
    /// Elapsed seconds per sample, keyed by benchmark title then input size.
    pub samples: BTreeMap<String, BTreeMap<usize, Vec<f64>>>,
}

impl SuiteResults {
    pub fn record(&mut self, benchmark: &str, size: usize, elapsed: Duration) {
        self.samples
            .entry(benchmark.to_string())
            .or_default()
            .entry(size)
            .or_default()
            .push(elapsed.as_secs_f64());
    }

    /// Fastest sample for a (benchmark, size) pair.
    pub fn best(&self, benchmark: &str, size: usize) -> Option<Duration> {
        self.samples
            .get(benchmark)?
            .get(&size)?
            .iter()
            .filter_map(|s| Duration::try_from_secs_f64(*s).ok())
            .min()
    }

    /// Sizes with at least one sample for `benchmark`, ascending.
    pub fn sizes(&self, benchmark: &str) -> Vec<usize> {
        self.samples
            .get(benchmark)
            .map(|by_size| by_size.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn sample_count(&self) -> usize {
        self.samples
            .values()
            .flat_map(|by_size| by_size.values())
            .map(Vec::len)
            .sum()
    }

    pub fn clear_samples(&mut self) {
        self.samples.clear();
    }
}

/// Results persistence seam.
pub trait ResultsStore: Send {
    /// Results for a suite, if any were recorded or configured.
    fn get(&self, suite: &str) -> Option<&SuiteResults>;

    /// Mutable results for a suite, created on first use.
    fn results_mut(&mut self, suite: &str) -> &mut SuiteResults;

    fn save(&mut self) -> Result<(), StoreError>;

    /// Drop the samples of every suite. Selections survive.
    fn reset(&mut self) -> Result<(), StoreError>;
}

/// In-memory store; `save()` only counts calls.
#[derive(Debug, Default)]
pub struct MemoryResultsStore {
    suites: BTreeMap<String, SuiteResults>,
    saves: usize,
}

impl MemoryResultsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preconfigure the selection of a suite.
    pub fn with_selection(mut self, suite: &str, selection: BenchmarkSelection) -> Self {
        self.results_mut(suite).selection = selection;
        self
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl ResultsStore for MemoryResultsStore {
    fn get(&self, suite: &str) -> Option<&SuiteResults> {
        self.suites.get(suite)
    }

    fn results_mut(&mut self, suite: &str) -> &mut SuiteResults {
        self.suites.entry(suite.to_string()).or_default()
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.saves += 1;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        self.suites.values_mut().for_each(SuiteResults::clear_samples);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ResultsDocument {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    suites: BTreeMap<String, SuiteResults>,
}

/// JSON-file backed store.
#[derive(Debug)]
pub struct JsonResultsStore {
    path: PathBuf,
    document: ResultsDocument,
}

impl JsonResultsStore {
    /// Load the document at `path`, or start empty.
    ///
    /// A document that fails to parse is logged and ignored rather than
    /// aborting startup; the next save overwrites it.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<ResultsDocument>(&content) {
                Ok(doc) => {
                    log::info!(
                        "[Results] Loaded {} suite(s) from {}",
                        doc.suites.len(),
                        path.display()
                    );
                    doc
                }
                Err(e) => {
                    log::warn!(
                        "[Results] Failed to parse {}, starting with empty results: {}",
                        path.display(),
                        e
                    );
                    ResultsDocument::default()
                }
            },
            Err(_) => ResultsDocument::default(),
        };
        JsonResultsStore { path, document }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_document(&mut self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        self.document.version = RESULTS_FORMAT_VERSION;
        let content = serde_json::to_string_pretty(&self.document)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        log::debug!("[Results] Saved results to {}", self.path.display());
        Ok(())
    }
}

impl ResultsStore for JsonResultsStore {
    fn get(&self, suite: &str) -> Option<&SuiteResults> {
        self.document.suites.get(suite)
    }

    fn results_mut(&mut self, suite: &str) -> &mut SuiteResults {
        self.document.suites.entry(suite.to_string()).or_default()
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.write_document()
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        self.document
            .suites
            .values_mut()
            .for_each(SuiteResults::clear_samples);
        self.write_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_best_picks_fastest_sample() {
        let mut r = SuiteResults::default();
        r.record("Insert", 16, Duration::from_micros(30));
        r.record("Insert", 16, Duration::from_micros(10));
        r.record("Insert", 32, Duration::from_micros(50));

        assert_eq!(r.best("Insert", 16), Some(Duration::from_micros(10)));
        assert_eq!(r.best("Insert", 64), None);
        assert_eq!(r.sizes("Insert"), vec![16, 32]);
        assert_eq!(r.sample_count(), 3);
    }

    #[test]
    fn test_best_skips_samples_that_are_not_durations() {
        let mut r = SuiteResults::default();
        r.samples
            .entry("Insert".to_string())
            .or_default()
            .insert(16, vec![1e30, -1.0, f64::NAN]);
        assert_eq!(r.best("Insert", 16), None);

        r.record("Insert", 16, Duration::from_micros(7));
        assert_eq!(r.best("Insert", 16), Some(Duration::from_micros(7)));
    }

    #[test]
    fn test_json_store_persists_samples_and_selection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("results.json");

        let mut store = JsonResultsStore::load(&path);
        store.results_mut("Vec").record("Push", 1024, Duration::from_millis(2));
        store.results_mut("Vec").selection.set_max_scale(10);
        store.save().unwrap();

        let reloaded = JsonResultsStore::load(&path);
        let vec = reloaded.get("Vec").unwrap();
        assert_eq!(vec.best("Push", 1024), Some(Duration::from_millis(2)));
        assert_eq!(vec.selection.scale_range.max, 10);
    }

    #[test]
    fn test_reset_keeps_selection() {
        let dir = tempdir().unwrap();
        let mut store = JsonResultsStore::load(dir.path().join("results.json"));
        store.results_mut("Vec").record("Push", 16, Duration::from_millis(1));
        store.results_mut("Vec").selection.selected.insert("Push".to_string());

        store.reset().unwrap();

        let vec = store.get("Vec").unwrap();
        assert_eq!(vec.sample_count(), 0);
        assert!(vec.selection.selected.contains("Push"));
    }

    #[test]
    fn test_corrupt_document_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonResultsStore::load(&path);
        assert!(store.get("Vec").is_none());
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let mut store = JsonResultsStore::load(blocker.join("results.json"));
        assert!(matches!(store.save(), Err(StoreError::IoError(_))));
    }
}
