//! Run State Tracking
//!
//! `RunState` is the lifecycle of a benchmark run:
//!
//! ```text
//!        start()            stop()
//! Idle ---------> Running ---------> Stopping
//!  ^                 |                  |
//!  |   run finished  |                  |  worker halted
//!  +-----------------+------------------+
//! ```
//!
//! The cycle has no terminal state. Transitions are only taken by the
//! `Runner`, on the owner thread.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Stopping,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Stopping => "stopping",
        }
    }

    /// Get all valid transitions FROM this state.
    pub fn valid_next_states(&self) -> &'static [RunState] {
        match self {
            RunState::Idle => &[RunState::Running],
            // Running -> Idle when the pass completes or a sample fails.
            RunState::Running => &[RunState::Stopping, RunState::Idle],
            RunState::Stopping => &[RunState::Idle],
        }
    }

    pub fn can_transition_to(&self, next: RunState) -> bool {
        self.valid_next_states().contains(&next)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
