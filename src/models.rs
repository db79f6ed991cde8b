//! Core data types for the benchmark runner.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Smallest selectable upper bound for the input size scale (2^4 = 16 elements).
pub const MIN_SCALE: u32 = 4;

/// Largest selectable upper bound for the input size scale (2^28 elements).
pub const MAX_SCALE: u32 = 28;

/// Upper scale bound used for suites that have never been configured.
pub const DEFAULT_MAX_SCALE: u32 = 16;

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every (benchmark, size) pair was measured.
    Completed,
    /// `stop()` was honoured at a sample boundary.
    Cancelled,
    /// A sample failed; the run was aborted and will not be retried.
    Failed(String),
}

impl StopReason {
    /// True for the abnormal stop reported after a fatal measurement failure.
    pub fn is_abnormal(&self) -> bool {
        matches!(self, StopReason::Failed(_))
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Completed => write!(f, "completed"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Notification delivered to the single run observer.
///
/// Transient; never persisted by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementEvent {
    Started {
        suite: String,
        benchmark: String,
        size: usize,
    },
    Measured {
        suite: String,
        benchmark: String,
        size: usize,
        elapsed: Duration,
    },
    Stopped {
        suite: String,
        reason: StopReason,
    },
}

/// Inclusive range of size exponents; a run measures sizes `1 << s` for each `s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawScaleRange")]
pub struct ScaleRange {
    pub min: u32,
    pub max: u32,
}

/// Unchecked wire form; persisted ranges go through [`ScaleRange::new`].
#[derive(Deserialize)]
#[serde(default)]
struct RawScaleRange {
    min: u32,
    max: u32,
}

impl Default for RawScaleRange {
    fn default() -> Self {
        let ScaleRange { min, max } = ScaleRange::default();
        RawScaleRange { min, max }
    }
}

impl From<RawScaleRange> for ScaleRange {
    fn from(raw: RawScaleRange) -> Self {
        ScaleRange::new(raw.min, raw.max)
    }
}

impl ScaleRange {
    /// `max` is clamped to `MIN_SCALE..=MAX_SCALE` and `min` to at most `max`.
    pub fn new(min: u32, max: u32) -> Self {
        let max = max.clamp(MIN_SCALE, MAX_SCALE);
        ScaleRange {
            min: min.min(max),
            max,
        }
    }

    /// Input sizes covered by this range, ascending.
    pub fn sizes(&self) -> Vec<usize> {
        (self.min..=self.max)
            .filter_map(|s| 1usize.checked_shl(s))
            .collect()
    }

    /// Largest input size of the range.
    pub fn max_size(&self) -> usize {
        1usize.checked_shl(self.max).unwrap_or(usize::MAX)
    }
}

impl Default for ScaleRange {
    fn default() -> Self {
        ScaleRange {
            min: 0,
            max: DEFAULT_MAX_SCALE,
        }
    }
}

/// Per-suite persisted selection state: which benchmarks run and how large the inputs get.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkSelection {
    /// Selected benchmark titles. Empty means "all".
    pub selected: BTreeSet<String>,
    /// Size exponent bounds.
    pub scale_range: ScaleRange,
}

impl BenchmarkSelection {
    /// Titles that a run will measure, in suite order.
    ///
    /// Falls back to every title when the stored selection is empty or shares
    /// nothing with the suite (e.g. benchmarks were renamed since it was saved).
    pub fn effective(&self, titles: &[String]) -> Vec<String> {
        let chosen: Vec<String> = titles
            .iter()
            .filter(|t| self.selected.contains(*t))
            .cloned()
            .collect();
        if chosen.is_empty() {
            titles.to_vec()
        } else {
            chosen
        }
    }

    /// Flip one benchmark in or out of the selection.
    ///
    /// Deselecting the last benchmark or selecting every benchmark collapses
    /// back to the empty "all" selection.
    pub fn toggle(&mut self, title: &str, titles: &[String]) {
        let mut current: BTreeSet<String> = self.effective(titles).into_iter().collect();
        if !current.remove(title) {
            if !titles.iter().any(|t| t == title) {
                return;
            }
            current.insert(title.to_string());
        }
        if current.is_empty() || current.len() == titles.len() {
            self.selected.clear();
        } else {
            self.selected = current;
        }
    }

    /// Restrict the selection to one benchmark; unknown titles are ignored.
    pub fn select_only(&mut self, title: &str, titles: &[String]) {
        if !titles.iter().any(|t| t == title) {
            return;
        }
        self.selected = std::iter::once(title.to_string()).collect();
    }

    pub fn select_all(&mut self) {
        self.selected.clear();
    }

    pub fn set_max_scale(&mut self, scale: u32) {
        let max = scale.clamp(MIN_SCALE, MAX_SCALE);
        self.scale_range = ScaleRange::new(self.scale_range.min, max);
    }

    pub fn increase_max_scale(&mut self) {
        self.set_max_scale((self.scale_range.max + 1).min(MAX_SCALE));
    }

    pub fn decrease_max_scale(&mut self) {
        self.set_max_scale(self.scale_range.max.saturating_sub(1).max(MIN_SCALE));
    }
}

/// Compact label for an input size: `16`, `1k`, `32k`, `1M`, `2G`.
pub fn size_label(size: usize) -> String {
    const UNITS: [(usize, &str); 3] = [(1 << 30, "G"), (1 << 20, "M"), (1 << 10, "k")];
    for (unit, suffix) in UNITS {
        if size >= unit && size % unit == 0 {
            return format!("{}{}", size / unit, suffix);
        }
    }
    size.to_string()
}

/// Title for the benchmark picker given the effective selection.
pub fn selection_label(selected: &[String], total: usize) -> String {
    match selected.len() {
        0 => "No Benchmarks".to_string(),
        1 => selected[0].clone(),
        n if n == total => "All Benchmarks".to_string(),
        n => format!("{} Benchmarks", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles() -> Vec<String> {
        vec!["Insert".into(), "Remove".into(), "Lookup".into()]
    }

    #[test]
    fn test_empty_selection_means_all() {
        let sel = BenchmarkSelection::default();
        assert_eq!(sel.effective(&titles()), titles());
    }

    #[test]
    fn test_toggle_out_of_all_then_back_collapses_to_empty() {
        let mut sel = BenchmarkSelection::default();
        sel.toggle("Remove", &titles());
        assert_eq!(sel.effective(&titles()), vec!["Insert".to_string(), "Lookup".to_string()]);

        sel.toggle("Remove", &titles());
        assert!(sel.selected.is_empty());
    }

    #[test]
    fn test_toggle_last_selected_falls_back_to_all() {
        let mut sel = BenchmarkSelection::default();
        sel.select_only("Insert", &titles());
        sel.toggle("Insert", &titles());
        assert!(sel.selected.is_empty());
        assert_eq!(sel.effective(&titles()).len(), 3);
    }

    #[test]
    fn test_select_only_ignores_unknown_title() {
        let mut sel = BenchmarkSelection::default();
        sel.select_only("Sort", &titles());
        assert!(sel.selected.is_empty());
    }

    #[test]
    fn test_stale_selection_falls_back_to_all() {
        let mut sel = BenchmarkSelection::default();
        sel.selected.insert("Renamed".to_string());
        assert_eq!(sel.effective(&titles()), titles());
    }

    #[test]
    fn test_max_scale_is_clamped() {
        let mut sel = BenchmarkSelection::default();
        sel.set_max_scale(MIN_SCALE);
        sel.decrease_max_scale();
        assert_eq!(sel.scale_range.max, MIN_SCALE);

        sel.set_max_scale(MAX_SCALE);
        sel.increase_max_scale();
        assert_eq!(sel.scale_range.max, MAX_SCALE);
    }

    #[test]
    fn test_scale_range_sizes() {
        assert_eq!(ScaleRange::new(4, 6).sizes(), vec![16, 32, 64]);
    }

    #[test]
    fn test_persisted_scale_range_is_clamped() {
        let range: ScaleRange = serde_json::from_str(r#"{"min":0,"max":64}"#).unwrap();
        assert_eq!(range, ScaleRange { min: 0, max: MAX_SCALE });
        assert_eq!(range.sizes().len(), MAX_SCALE as usize + 1);

        let range: ScaleRange = serde_json::from_str(r#"{"min":9,"max":2}"#).unwrap();
        assert_eq!(range, ScaleRange { min: MIN_SCALE, max: MIN_SCALE });

        let range: ScaleRange = serde_json::from_str("{}").unwrap();
        assert_eq!(range, ScaleRange::default());
    }

    #[test]
    fn test_size_label() {
        assert_eq!(size_label(16), "16");
        assert_eq!(size_label(1024), "1k");
        assert_eq!(size_label(1536), "1536");
        assert_eq!(size_label(1 << 25), "32M");
        assert_eq!(size_label(1 << 31), "2G");
    }

    #[test]
    fn test_selection_label() {
        let all = titles();
        assert_eq!(selection_label(&all, 3), "All Benchmarks");
        assert_eq!(selection_label(&all[..1], 3), "Insert");
        assert_eq!(selection_label(&all[..2], 3), "2 Benchmarks");
        assert_eq!(selection_label(&all[..1], 1), "Insert");
    }
}
