//! Benchmark suites and the suite provider seam.
//!
//! A suite is an ordered list of named benchmarks. Each benchmark body gets a
//! freshly generated input of the requested size and a [`Timer`]; setup done
//! outside `Timer::measure` is not counted. A body that never calls `measure`
//! is timed as a whole.

pub mod collections;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use collections::CollectionSuites;

/// Benchmark body: receives the input and a timer, returns an error message on failure.
pub type BenchmarkFn = dyn Fn(&[u64], &mut Timer) -> Result<(), String> + Send + Sync;

/// Accumulates the timed portion of one sample.
#[derive(Debug, Default)]
pub struct Timer {
    elapsed: Option<Duration>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` inside the timed region. May be called more than once per sample.
    pub fn measure<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = std::hint::black_box(f());
        let spent = start.elapsed();
        self.elapsed = Some(self.elapsed.unwrap_or_default() + spent);
        result
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }
}

/// One named benchmark.
#[derive(Clone)]
pub struct Benchmark {
    title: String,
    body: Arc<BenchmarkFn>,
}

impl Benchmark {
    pub fn new<F>(title: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[u64], &mut Timer) -> Result<(), String> + Send + Sync + 'static,
    {
        Benchmark {
            title: title.into(),
            body: Arc::new(body),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Run one sample and return its duration.
    pub fn run(&self, input: &[u64]) -> Result<Duration, String> {
        let mut timer = Timer::new();
        let start = Instant::now();
        (self.body)(input, &mut timer)?;
        Ok(timer.elapsed().unwrap_or_else(|| start.elapsed()))
    }
}

impl fmt::Debug for Benchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Benchmark").field("title", &self.title).finish()
    }
}

/// An ordered collection of benchmarks sharing one input generator.
#[derive(Clone, Debug)]
pub struct BenchmarkSuite {
    title: String,
    benchmarks: Vec<Benchmark>,
}

impl BenchmarkSuite {
    pub fn new(title: impl Into<String>) -> Self {
        BenchmarkSuite {
            title: title.into(),
            benchmarks: Vec::new(),
        }
    }

    /// Builder-style registration. Titles must be unique within a suite;
    /// a duplicate replaces the earlier benchmark.
    pub fn with_benchmark<F>(mut self, title: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[u64], &mut Timer) -> Result<(), String> + Send + Sync + 'static,
    {
        let bench = Benchmark::new(title, body);
        match self.benchmarks.iter_mut().find(|b| b.title == bench.title) {
            Some(existing) => *existing = bench,
            None => self.benchmarks.push(bench),
        }
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn benchmarks(&self) -> &[Benchmark] {
        &self.benchmarks
    }

    pub fn benchmark_titles(&self) -> Vec<String> {
        self.benchmarks.iter().map(|b| b.title.clone()).collect()
    }

    pub fn benchmark(&self, title: &str) -> Option<&Benchmark> {
        self.benchmarks.iter().find(|b| b.title == title)
    }
}

/// Source of the ordered suite list.
pub trait SuiteProvider {
    fn suites(&self) -> Vec<Arc<BenchmarkSuite>>;
}

impl SuiteProvider for Vec<Arc<BenchmarkSuite>> {
    fn suites(&self) -> Vec<Arc<BenchmarkSuite>> {
        self.clone()
    }
}

/// Input for one sample: `0..size`, shuffled when `randomized`.
pub fn generate_input(size: usize, randomized: bool, rng: &mut StdRng) -> Vec<u64> {
    let mut input: Vec<u64> = (0..size as u64).collect();
    if randomized {
        input.shuffle(rng);
    }
    input
}
