//! Built-in suites measuring the standard library collections.
//!
//! Every suite measures the same operations against its own container so the
//! charts are comparable across suites. Lookup benchmarks verify their hits;
//! a miss is reported as a measurement failure.

use super::{BenchmarkSuite, SuiteProvider};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

/// Provider for the built-in `Vec`, `VecDeque`, `BTreeSet` and `HashSet` suites.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollectionSuites;

impl SuiteProvider for CollectionSuites {
    fn suites(&self) -> Vec<Arc<BenchmarkSuite>> {
        vec![
            Arc::new(vec_suite()),
            Arc::new(vec_deque_suite()),
            Arc::new(btree_set_suite()),
            Arc::new(hash_set_suite()),
        ]
    }
}

fn missing(value: u64) -> String {
    format!("lookup missed element {}", value)
}

pub fn vec_suite() -> BenchmarkSuite {
    BenchmarkSuite::new("Vec")
        .with_benchmark("Push", |input, timer| {
            timer.measure(|| {
                let mut v = Vec::new();
                for &x in input {
                    v.push(x);
                }
                v
            });
            Ok(())
        })
        .with_benchmark("Iteration", |input, timer| {
            let v: Vec<u64> = input.to_vec();
            timer.measure(|| v.iter().fold(0u64, |acc, x| acc.wrapping_add(*x)));
            Ok(())
        })
        .with_benchmark("Sort", |input, timer| {
            let mut v: Vec<u64> = input.to_vec();
            timer.measure(|| v.sort_unstable());
            Ok(())
        })
        .with_benchmark("Binary Search", |input, timer| {
            let mut v: Vec<u64> = input.to_vec();
            v.sort_unstable();
            timer.measure(|| {
                input
                    .iter()
                    .find(|x| v.binary_search(*x).is_err())
                    .map_or(Ok(()), |x| Err(missing(*x)))
            })
        })
}

pub fn vec_deque_suite() -> BenchmarkSuite {
    BenchmarkSuite::new("VecDeque")
        .with_benchmark("Push Back", |input, timer| {
            timer.measure(|| {
                let mut d = VecDeque::new();
                for &x in input {
                    d.push_back(x);
                }
                d
            });
            Ok(())
        })
        .with_benchmark("Push Front", |input, timer| {
            timer.measure(|| {
                let mut d = VecDeque::new();
                for &x in input {
                    d.push_front(x);
                }
                d
            });
            Ok(())
        })
        .with_benchmark("Pop Front", |input, timer| {
            let mut d: VecDeque<u64> = input.iter().copied().collect();
            let popped = timer.measure(|| {
                let mut n = 0usize;
                while d.pop_front().is_some() {
                    n += 1;
                }
                n
            });
            if popped == input.len() {
                Ok(())
            } else {
                Err(format!("popped {} of {} elements", popped, input.len()))
            }
        })
}

pub fn btree_set_suite() -> BenchmarkSuite {
    BenchmarkSuite::new("BTreeSet")
        .with_benchmark("Insert", |input, timer| {
            timer.measure(|| {
                let mut set = BTreeSet::new();
                for &x in input {
                    set.insert(x);
                }
                set
            });
            Ok(())
        })
        .with_benchmark("Remove", |input, timer| {
            let mut set: BTreeSet<u64> = input.iter().copied().collect();
            timer.measure(|| {
                for x in input {
                    set.remove(x);
                }
            });
            Ok(())
        })
        .with_benchmark("Lookup", |input, timer| {
            let set: BTreeSet<u64> = input.iter().copied().collect();
            timer.measure(|| {
                input
                    .iter()
                    .find(|x| !set.contains(*x))
                    .map_or(Ok(()), |x| Err(missing(*x)))
            })
        })
        .with_benchmark("Iteration", |input, timer| {
            let set: BTreeSet<u64> = input.iter().copied().collect();
            timer.measure(|| set.iter().fold(0u64, |acc, x| acc.wrapping_add(*x)));
            Ok(())
        })
}

pub fn hash_set_suite() -> BenchmarkSuite {
    BenchmarkSuite::new("HashSet")
        .with_benchmark("Insert", |input, timer| {
            timer.measure(|| {
                let mut set = HashSet::new();
                for &x in input {
                    set.insert(x);
                }
                set
            });
            Ok(())
        })
        .with_benchmark("Remove", |input, timer| {
            let mut set: HashSet<u64> = input.iter().copied().collect();
            timer.measure(|| {
                for x in input {
                    set.remove(x);
                }
            });
            Ok(())
        })
        .with_benchmark("Lookup", |input, timer| {
            let set: HashSet<u64> = input.iter().copied().collect();
            timer.measure(|| {
                input
                    .iter()
                    .find(|x| !set.contains(*x))
                    .map_or(Ok(()), |x| Err(missing(*x)))
            })
        })
        .with_benchmark("Iteration", |input, timer| {
            let set: HashSet<u64> = input.iter().copied().collect();
            timer.measure(|| set.iter().fold(0u64, |acc, x| acc.wrapping_add(*x)));
            Ok(())
        })
}
