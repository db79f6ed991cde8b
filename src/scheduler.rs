//! Debounced Refresh Scheduling
//!
//! Collapses bursts of refresh requests for one logical action (status text,
//! chart redraw, autosave) into a bounded execution rate without losing the
//! final request.
//!
//! The scheduler is pure bookkeeping: it never runs the action itself. The
//! owner loop executes the action when `request()` answers [`Dispatch::Now`],
//! and sleeps until [`RefreshScheduler::next_deadline`] to collect deferred
//! fires through [`RefreshScheduler::take_due`]. Because the action runs in the
//! owner at fire time, whatever payload it reads is the latest state rather
//! than a snapshot taken when the request arrived.
//!
//! # Invariants
//!
//! - At most one deferred fire is outstanding per task.
//! - Two scheduled executions of the same task are never closer than
//!   `min_interval`.
//! - One fire satisfies every request accumulated while it was pending.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// The refresh actions driven by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshKind {
    /// Status / progress text.
    Progress,
    /// Chart redraw.
    Chart,
    /// Autosave of the results store.
    Save,
}

impl fmt::Display for RefreshKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshKind::Progress => write!(f, "progress"),
            RefreshKind::Chart => write!(f, "chart"),
            RefreshKind::Save => write!(f, "save"),
        }
    }
}

/// How a task reacts to a request outside its cooldown window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Execute immediately when the cooldown has elapsed, otherwise defer to
    /// the end of the cooldown.
    Leading,
    /// Always defer by `min_interval` from the first request.
    Trailing,
}

/// Outcome of a `request()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Caller must execute the action now.
    Now,
    /// A deferred fire was scheduled for the given instant.
    Deferred(Instant),
    /// A deferred fire was already outstanding; this request rides on it.
    Coalesced,
}

/// One debounced action.
#[derive(Debug, Clone)]
pub struct RefreshTask {
    pub min_interval: Duration,
    pub policy: RefreshPolicy,
    /// A request arrived during the cooldown and a fire is outstanding.
    pub pending: bool,
    /// Earliest instant the action may run again.
    pub next_eligible: Option<Instant>,
    /// When the outstanding fire is due. Only meaningful while `pending`.
    pub deadline: Option<Instant>,
    /// Number of executions recorded, scheduled or unconditional.
    pub executions: u64,
}

impl RefreshTask {
    pub fn new(min_interval: Duration, policy: RefreshPolicy) -> Self {
        RefreshTask {
            min_interval,
            policy,
            pending: false,
            next_eligible: None,
            deadline: None,
            executions: 0,
        }
    }

    fn cooled_down(&self, now: Instant) -> bool {
        self.next_eligible.map_or(true, |at| now >= at)
    }

    fn record_execution(&mut self, now: Instant) {
        self.pending = false;
        self.deadline = None;
        self.next_eligible = Some(now + self.min_interval);
        self.executions += 1;
    }
}

/// Debounce bookkeeping for a fixed set of tasks keyed by `K`.
#[derive(Debug, Clone)]
pub struct RefreshScheduler<K> {
    tasks: HashMap<K, RefreshTask>,
}

impl<K> Default for RefreshScheduler<K> {
    fn default() -> Self {
        RefreshScheduler {
            tasks: HashMap::new(),
        }
    }
}

impl<K> RefreshScheduler<K>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Re-registering replaces its interval and policy and
    /// drops any outstanding fire.
    pub fn register(&mut self, key: K, min_interval: Duration, policy: RefreshPolicy) {
        self.tasks.insert(key, RefreshTask::new(min_interval, policy));
    }

    pub fn task(&self, key: K) -> Option<&RefreshTask> {
        self.tasks.get(&key)
    }

    pub fn is_pending(&self, key: K) -> bool {
        self.tasks.get(&key).map_or(false, |t| t.pending)
    }

    /// Ask for `key` to run.
    ///
    /// Unregistered keys always answer `Dispatch::Now`: with no cooldown
    /// configured there is nothing to debounce.
    pub fn request(&mut self, key: K, now: Instant) -> Dispatch {
        let Some(task) = self.tasks.get_mut(&key) else {
            log::debug!("[Scheduler] request for unregistered task {:?}", key);
            return Dispatch::Now;
        };

        if task.pending {
            return Dispatch::Coalesced;
        }

        match task.policy {
            RefreshPolicy::Leading if task.cooled_down(now) => {
                task.record_execution(now);
                Dispatch::Now
            }
            RefreshPolicy::Leading => {
                let at = task.next_eligible.map_or(now, |at| at.max(now));
                task.pending = true;
                task.deadline = Some(at);
                Dispatch::Deferred(at)
            }
            RefreshPolicy::Trailing => {
                let mut at = now + task.min_interval;
                if let Some(eligible) = task.next_eligible {
                    at = at.max(eligible);
                }
                task.pending = true;
                task.deadline = Some(at);
                Dispatch::Deferred(at)
            }
        }
    }

    /// Deferred fire for `key`. Returns false when nothing was outstanding,
    /// i.e. the timer was cancelled or already satisfied.
    pub fn fire(&mut self, key: K, now: Instant) -> bool {
        match self.tasks.get_mut(&key) {
            Some(task) if task.pending => {
                task.record_execution(now);
                true
            }
            _ => false,
        }
    }

    /// Drop the outstanding fire for `key` without executing it.
    pub fn cancel(&mut self, key: K) {
        if let Some(task) = self.tasks.get_mut(&key) {
            task.pending = false;
            task.deadline = None;
        }
    }

    /// Record an unconditional synchronous execution of `key`: cancels the
    /// outstanding fire and restarts the cooldown.
    pub fn mark_executed(&mut self, key: K, now: Instant) {
        if let Some(task) = self.tasks.get_mut(&key) {
            task.record_execution(now);
        }
    }

    /// Earliest outstanding deferred fire.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks
            .values()
            .filter(|t| t.pending)
            .filter_map(|t| t.deadline)
            .min()
    }

    /// Fire every task whose deadline has passed and return their keys,
    /// earliest deadline first.
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(Instant, K)> = self
            .tasks
            .iter()
            .filter(|(_, t)| t.pending)
            .filter_map(|(k, t)| t.deadline.filter(|d| *d <= now).map(|d| (d, *k)))
            .collect();
        due.sort_by_key(|(d, _)| *d);

        for (_, key) in &due {
            self.fire(*key, now);
        }
        due.into_iter().map(|(_, k)| k).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MS: Duration = Duration::from_millis(1);

    fn leading(interval_ms: u64) -> RefreshScheduler<RefreshKind> {
        let mut s = RefreshScheduler::new();
        s.register(RefreshKind::Chart, MS * interval_ms as u32, RefreshPolicy::Leading);
        s
    }

    #[test]
    fn test_first_request_runs_immediately() {
        let mut s = leading(100);
        let t0 = Instant::now();
        assert_eq!(s.request(RefreshKind::Chart, t0), Dispatch::Now);
        assert_eq!(s.task(RefreshKind::Chart).unwrap().next_eligible, Some(t0 + MS * 100));
    }

    #[test]
    fn test_burst_inside_cooldown_defers_once() {
        let mut s = leading(100);
        let t0 = Instant::now();
        s.request(RefreshKind::Chart, t0);

        assert_eq!(s.request(RefreshKind::Chart, t0 + MS * 10), Dispatch::Deferred(t0 + MS * 100));
        assert_eq!(s.request(RefreshKind::Chart, t0 + MS * 20), Dispatch::Coalesced);
        assert_eq!(s.request(RefreshKind::Chart, t0 + MS * 90), Dispatch::Coalesced);
        assert_eq!(s.next_deadline(), Some(t0 + MS * 100));

        assert!(s.take_due(t0 + MS * 99).is_empty());
        assert_eq!(s.take_due(t0 + MS * 100), vec![RefreshKind::Chart]);
        assert!(!s.is_pending(RefreshKind::Chart));
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn test_cancel_prevents_late_fire() {
        let mut s = leading(100);
        let t0 = Instant::now();
        s.request(RefreshKind::Chart, t0);
        s.request(RefreshKind::Chart, t0 + MS * 5);
        s.cancel(RefreshKind::Chart);

        assert!(!s.fire(RefreshKind::Chart, t0 + MS * 100));
        assert!(s.take_due(t0 + MS * 500).is_empty());
    }

    #[test]
    fn test_mark_executed_restarts_cooldown() {
        let mut s = leading(100);
        let t0 = Instant::now();
        s.request(RefreshKind::Chart, t0);
        s.request(RefreshKind::Chart, t0 + MS * 50);
        s.mark_executed(RefreshKind::Chart, t0 + MS * 60);

        assert!(!s.is_pending(RefreshKind::Chart));
        assert_eq!(
            s.request(RefreshKind::Chart, t0 + MS * 100),
            Dispatch::Deferred(t0 + MS * 160)
        );
    }

    #[test]
    fn test_trailing_policy_always_defers() {
        let mut s = RefreshScheduler::new();
        s.register(RefreshKind::Save, Duration::from_secs(30), RefreshPolicy::Trailing);
        let t0 = Instant::now();

        assert_eq!(
            s.request(RefreshKind::Save, t0),
            Dispatch::Deferred(t0 + Duration::from_secs(30))
        );
        assert_eq!(s.request(RefreshKind::Save, t0 + MS), Dispatch::Coalesced);
    }

    #[test]
    fn test_unregistered_key_runs_now() {
        let mut s: RefreshScheduler<RefreshKind> = RefreshScheduler::new();
        assert_eq!(s.request(RefreshKind::Progress, Instant::now()), Dispatch::Now);
    }

    #[test]
    fn test_take_due_orders_by_deadline() {
        let mut s = RefreshScheduler::new();
        s.register(RefreshKind::Chart, MS * 50, RefreshPolicy::Trailing);
        s.register(RefreshKind::Progress, MS * 10, RefreshPolicy::Trailing);
        let t0 = Instant::now();
        s.request(RefreshKind::Chart, t0);
        s.request(RefreshKind::Progress, t0);

        assert_eq!(s.take_due(t0 + MS * 60), vec![RefreshKind::Progress, RefreshKind::Chart]);
    }

    /// Drives a scheduler with request offsets (ms) and fires deferred work as
    /// time advances; returns execution instants.
    fn simulate(interval: Duration, policy: RefreshPolicy, offsets: &[u64]) -> (Vec<Instant>, Instant) {
        let mut s = RefreshScheduler::new();
        s.register(RefreshKind::Chart, interval, policy);
        let t0 = Instant::now();
        let mut runs = Vec::new();

        let mut sorted = offsets.to_vec();
        sorted.sort_unstable();
        for off in sorted {
            let now = t0 + MS * off as u32;
            while let Some(deadline) = s.next_deadline().filter(|d| *d <= now) {
                s.take_due(deadline);
                runs.push(deadline);
            }
            if s.request(RefreshKind::Chart, now) == Dispatch::Now {
                runs.push(now);
            }
        }
        if let Some(deadline) = s.next_deadline() {
            s.take_due(deadline);
            runs.push(deadline);
        }
        (runs, t0)
    }

    proptest! {
        #[test]
        fn prop_executions_respect_min_interval(
            interval_ms in 1u64..200,
            offsets in proptest::collection::vec(0u64..2_000, 1..60),
            trailing in any::<bool>(),
        ) {
            let policy = if trailing { RefreshPolicy::Trailing } else { RefreshPolicy::Leading };
            let interval = MS * interval_ms as u32;
            let (runs, _) = simulate(interval, policy, &offsets);
            for pair in runs.windows(2) {
                prop_assert!(pair[1] - pair[0] >= interval);
            }
        }

        #[test]
        fn prop_last_request_is_always_honoured(
            interval_ms in 1u64..200,
            offsets in proptest::collection::vec(0u64..2_000, 1..60),
        ) {
            let interval = MS * interval_ms as u32;
            let (runs, t0) = simulate(interval, RefreshPolicy::Leading, &offsets);
            let last_request = t0 + MS * *offsets.iter().max().unwrap() as u32;
            prop_assert!(runs.last().map_or(false, |r| *r >= last_request));
        }

        #[test]
        fn prop_burst_within_one_window_fires_once(
            interval_ms in 10u64..200,
            count in 2usize..50,
        ) {
            let interval = MS * interval_ms as u32;
            let mut s = RefreshScheduler::new();
            s.register(RefreshKind::Chart, interval, RefreshPolicy::Trailing);
            let t0 = Instant::now();
            for i in 0..count {
                let now = t0 + MS * ((i as u64 * (interval_ms - 1)) / count as u64) as u32;
                s.request(RefreshKind::Chart, now);
            }
            prop_assert_eq!(s.take_due(t0 + interval * 2).len(), 1);
            prop_assert_eq!(s.task(RefreshKind::Chart).unwrap().executions, 1);
        }
    }
}
