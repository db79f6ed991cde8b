//! UI Module - presenter seam and AppController
//!
//! Handles the interface between the run core and a front end. The
//! controller never prints or draws itself; everything user-visible goes
//! through the [`Presenter`] trait so the console front end and tests can
//! plug in their own implementation.

pub mod console;
pub mod controller;
pub mod threading;

use crate::orchestrator::RunState;
use crate::render::ChartArtifact;

pub use console::{parse_command, ConsolePresenter};
pub use controller::{AppController, Command};
pub use threading::CommandBridge;

/// Picker state for the current suite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionSummary {
    pub suite: String,
    /// Every benchmark of the suite with its selected flag, in suite order.
    pub benchmarks: Vec<(String, bool)>,
    /// "All Benchmarks", a single title, or "N Benchmarks".
    pub label: String,
    /// Label of the largest input size, e.g. `64k`.
    pub max_size: String,
}

/// Front-end operations driven by the controller.
///
/// All calls happen on the controller's owner task.
pub trait Presenter: Send {
    fn show_status(&mut self, status: &str);
    fn show_chart(&mut self, chart: &ChartArtifact);
    fn set_document_edited(&mut self, edited: bool);
    fn set_run_state(&mut self, state: RunState);
    fn show_selection(&mut self, _summary: &SelectionSummary) {}
}
