//! Chart rendering seam.
//!
//! The controller only calls a renderer after a debounced chart refresh fires.
//! `TableRenderer` produces a plain-text table of the best time per
//! (benchmark, size) pair for the console front end.

use crate::models::size_label;
use crate::results::SuiteResults;
use crate::suites::BenchmarkSuite;
use std::collections::BTreeSet;
use std::fmt::Write;
use std::time::Duration;

/// Display artifact produced by a [`Renderer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartArtifact {
    pub title: String,
    pub body: String,
}

pub trait Renderer: Send {
    fn render(&self, suite: &BenchmarkSuite, results: &SuiteResults, amortized: bool) -> ChartArtifact;
}

/// Text table renderer. Amortized mode reports time per element.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableRenderer;

impl Renderer for TableRenderer {
    fn render(&self, suite: &BenchmarkSuite, results: &SuiteResults, amortized: bool) -> ChartArtifact {
        let titles = results.selection.effective(&suite.benchmark_titles());
        let sizes: BTreeSet<usize> = titles.iter().flat_map(|t| results.sizes(t)).collect();

        let mut body = String::new();
        let _ = write!(body, "{:>8}", "size");
        for title in &titles {
            let _ = write!(body, " | {:>14}", title);
        }
        body.push('\n');

        for size in &sizes {
            let _ = write!(body, "{:>8}", size_label(*size));
            for title in &titles {
                let cell = match results.best(title, *size) {
                    Some(best) if amortized => {
                        format_duration(best / u32::try_from(*size).unwrap_or(u32::MAX).max(1))
                    }
                    Some(best) => format_duration(best),
                    None => "-".to_string(),
                };
                let _ = write!(body, " | {:>14}", cell);
            }
            body.push('\n');
        }

        let mode = if amortized { "per element" } else { "total" };
        ChartArtifact {
            title: format!("{} ({})", suite.title(), mode),
            body,
        }
    }
}

/// Human-readable duration with an adaptive unit.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs >= 1.0 {
        format!("{:.3}s", secs)
    } else if secs >= 1e-3 {
        format!("{:.3}ms", secs * 1e3)
    } else if secs >= 1e-6 {
        format!("{:.3}µs", secs * 1e6)
    } else {
        format!("{}ns", d.as_nanos())
    }
}
