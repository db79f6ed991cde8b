//! AppController: single owner of the run core.
//!
//! The controller owns the [`Runner`], the settings handle, the refresh
//! scheduler, the renderer and the presenter. `run()` is the owner loop: one
//! `tokio::select!` over front-end commands, setting changes, scheduler
//! deadlines and worker messages. Every state mutation happens inside that
//! loop, so nothing here needs a lock.
//!
//! # Event wiring
//!
//! - `started` updates the status text through the debounced progress task.
//! - `measured` schedules a chart refresh and an autosave and marks the
//!   document edited.
//! - `stopped` saves immediately, then either completes a pending quit,
//!   restarts once for a pending parameter change, or reports `Idle`.
//!
//! Parameter changes (selection, scale, randomized inputs, suite) never touch
//! a run in flight: the controller stops it and starts a new one with the new
//! parameters after `stopped` arrives.

use crate::config::{BenchConfig, SettingChange, SettingsManager};
use crate::models::{selection_label, size_label, BenchmarkSelection, MeasurementEvent};
use crate::orchestrator::{RunState, Runner, RunnerEvents, WorkerMessage};
use crate::render::Renderer;
use crate::scheduler::{Dispatch, RefreshKind, RefreshPolicy, RefreshScheduler};
use crate::suites::BenchmarkSuite;
use super::{Presenter, SelectionSummary};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Front-end requests handled by the owner loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start when idle, stop when running.
    Run,
    Start,
    Stop,
    SelectSuite(String),
    NextSuite,
    PreviousSuite,
    ToggleBenchmark(String),
    /// Select exactly one benchmark.
    SelectBenchmark(String),
    SelectAllBenchmarks,
    SetMaxScale(u32),
    IncreaseMaxScale,
    DecreaseMaxScale,
    SetAmortized(bool),
    SetRandomizeInputs(bool),
    /// Clear all results. Only honoured while idle.
    NewDocument,
    Save,
    Quit,
}

pub struct AppController {
    runner: Runner,
    events: RunnerEvents,
    settings: SettingsManager,
    setting_changes: mpsc::UnboundedReceiver<SettingChange>,
    scheduler: RefreshScheduler<RefreshKind>,
    renderer: Box<dyn Renderer>,
    presenter: Box<dyn Presenter>,
    selected_suite: Option<Arc<BenchmarkSuite>>,
    /// Latest status text; the progress task shows whatever is here when it fires.
    status: String,
    document_edited: bool,
    waiting_for_params_change: bool,
    terminating: bool,
    exit_on_idle: bool,
    quit: bool,
}

impl AppController {
    pub fn new(
        runner: Runner,
        events: RunnerEvents,
        settings: SettingsManager,
        renderer: Box<dyn Renderer>,
        presenter: Box<dyn Presenter>,
        config: &BenchConfig,
    ) -> Self {
        let mut scheduler = RefreshScheduler::new();
        scheduler.register(RefreshKind::Progress, config.progress_interval(), RefreshPolicy::Leading);
        scheduler.register(RefreshKind::Chart, config.chart_interval(), RefreshPolicy::Leading);
        scheduler.register(RefreshKind::Save, config.save_interval(), RefreshPolicy::Trailing);

        let setting_changes = settings.subscribe();

        AppController {
            runner,
            events,
            settings,
            setting_changes,
            scheduler,
            renderer,
            presenter,
            selected_suite: None,
            status: String::new(),
            document_edited: false,
            waiting_for_params_change: false,
            terminating: false,
            exit_on_idle: false,
            quit: false,
        }
    }

    /// Leave the loop as soon as the runner is idle after a run (one-shot mode).
    pub fn with_exit_on_idle(mut self, exit_on_idle: bool) -> Self {
        self.exit_on_idle = exit_on_idle;
        self
    }

    /// Owner loop. Returns after `Quit` (and the shutdown it implies), or when
    /// the command channel closes outside one-shot mode.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.launch();
        let mut commands_closed = false;

        while !self.quit {
            let deadline = self.scheduler.next_deadline();
            tokio::select! {
                biased;
                cmd = commands.recv(), if !commands_closed => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        commands_closed = true;
                        if !self.exit_on_idle {
                            log::info!("[Controller] Command channel closed, shutting down");
                            self.request_quit();
                        }
                    }
                },
                Some(change) = self.setting_changes.recv() => self.on_setting_change(change),
                _ = wait_for_deadline(deadline) => self.on_deadline(),
                Some(msg) = self.events.recv() => self.on_worker_message(msg),
            }
        }

        if self.scheduler.is_pending(RefreshKind::Progress) {
            self.scheduler.cancel(RefreshKind::Progress);
            self.presenter.show_status(&self.status);
        }
        self.save();
        log::info!("[Controller] Owner loop finished");
    }

    fn launch(&mut self) {
        self.set_status("Loading benchmarks".to_string());
        if self.runner.suites().is_empty() {
            log::warn!("[Controller] No suites loaded");
            self.set_status("No benchmarks available".to_string());
            if self.exit_on_idle {
                self.quit = true;
            }
            return;
        }
        self.set_status("Ready".to_string());
        self.presenter.set_run_state(RunState::Idle);

        let remembered = self.settings.selected_suite();
        let suite = remembered
            .as_deref()
            .and_then(|title| self.runner.suite(title))
            .or_else(|| self.runner.suites().first())
            .cloned();
        if let Some(suite) = suite {
            self.select_suite(suite);
        }
    }

    pub fn handle_command(&mut self, cmd: Command) {
        log::debug!("[Controller] Command: {:?}", cmd);
        match cmd {
            Command::Run => match self.runner.state() {
                RunState::Idle => self.start(),
                RunState::Running => {
                    self.stop();
                }
                RunState::Stopping => {}
            },
            Command::Start => self.start(),
            Command::Stop => {
                // Only a stop that takes effect cancels a pending restart.
                if self.stop() {
                    self.waiting_for_params_change = false;
                }
            }
            Command::SelectSuite(title) => match self.runner.suite(&title).cloned() {
                Some(suite) => self.select_suite(suite),
                None => log::warn!("[Controller] Unknown suite '{}'", title),
            },
            Command::NextSuite => self.step_suite(1),
            Command::PreviousSuite => self.step_suite(-1),
            Command::ToggleBenchmark(title) => {
                self.update_selection(|selection, titles| selection.toggle(&title, titles))
            }
            Command::SelectBenchmark(title) => {
                self.update_selection(|selection, titles| selection.select_only(&title, titles))
            }
            Command::SelectAllBenchmarks => self.update_selection(|selection, _| selection.select_all()),
            Command::SetMaxScale(scale) => {
                self.update_selection(|selection, _| selection.set_max_scale(scale))
            }
            Command::IncreaseMaxScale => {
                self.update_selection(|selection, _| selection.increase_max_scale())
            }
            Command::DecreaseMaxScale => {
                self.update_selection(|selection, _| selection.decrease_max_scale())
            }
            Command::SetAmortized(value) => self.settings.set_amortized(value),
            Command::SetRandomizeInputs(value) => self.settings.set_randomize_inputs(value),
            Command::NewDocument => self.new_document(),
            Command::Save => self.save(),
            Command::Quit => self.request_quit(),
        }
    }

    fn on_setting_change(&mut self, change: SettingChange) {
        log::info!("[Controller] Setting changed: {:?}", change);
        match change {
            SettingChange::Amortized(_) => self.refresh_chart(),
            SettingChange::RandomizeInputs(_) => self.refresh_runner_params(),
        }
    }

    fn on_worker_message(&mut self, msg: WorkerMessage) {
        if let Some(event) = self.runner.process(msg) {
            self.on_event(event);
        }
    }

    fn on_event(&mut self, event: MeasurementEvent) {
        match event {
            MeasurementEvent::Started {
                suite,
                benchmark,
                size,
            } => {
                self.set_status(format!("Measuring {} : {} : {}", suite, size_label(size), benchmark));
            }
            MeasurementEvent::Measured { .. } => {
                self.schedule_chart_refresh();
                self.set_document_edited(true);
                self.schedule_save();
            }
            MeasurementEvent::Stopped { suite, reason } => {
                self.save();
                if self.terminating {
                    log::info!("[Controller] Run of '{}' stopped, completing shutdown", suite);
                    self.presenter.set_run_state(RunState::Idle);
                    self.quit = true;
                    return;
                }
                if reason.is_abnormal() {
                    log::error!("[Controller] Run of '{}' aborted: {}", suite, reason);
                    self.waiting_for_params_change = false;
                    self.presenter.set_run_state(RunState::Idle);
                    self.set_status(format!("Run failed: {}", reason));
                    self.quit_if_one_shot();
                    return;
                }
                if self.waiting_for_params_change {
                    self.waiting_for_params_change = false;
                    log::info!("[Controller] Restarting with new parameters");
                    self.start();
                    return;
                }
                self.presenter.set_run_state(RunState::Idle);
                self.set_status("Idle".to_string());
                self.quit_if_one_shot();
            }
        }
    }

    fn on_deadline(&mut self) {
        let now = clock_now();
        for key in self.scheduler.take_due(now) {
            match key {
                RefreshKind::Progress => self.presenter.show_status(&self.status),
                RefreshKind::Chart => self.render_chart(),
                RefreshKind::Save => self.save(),
            }
        }
    }

    fn start(&mut self) {
        if self.runner.state() != RunState::Idle {
            return;
        }
        let Some(suite) = self.selected_suite.clone() else {
            log::warn!("[Controller] Start requested with no suite selected");
            self.quit_if_one_shot();
            return;
        };
        let randomized = self.settings.randomize_inputs();
        if self.runner.start(suite.title(), randomized) {
            self.presenter.set_run_state(RunState::Running);
            self.set_status(format!("Running {}", suite.title()));
        } else {
            self.quit_if_one_shot();
        }
    }

    fn stop(&mut self) -> bool {
        if !self.runner.stop() {
            return false;
        }
        self.presenter.set_run_state(RunState::Stopping);
        self.set_status("Stopping...".to_string());
        true
    }

    fn request_quit(&mut self) {
        if self.runner.state() == RunState::Idle {
            self.quit = true;
            return;
        }
        log::info!("[Controller] Quit requested while {}, waiting for the run to stop", self.runner.state());
        self.terminating = true;
        self.stop();
    }

    fn quit_if_one_shot(&mut self) {
        if self.exit_on_idle && self.runner.state() == RunState::Idle {
            self.quit = true;
        }
    }

    /// Apply changed run parameters: restart a run in flight, save otherwise.
    fn refresh_runner_params(&mut self) {
        if self.runner.state() == RunState::Running {
            log::info!("[Controller] Parameters changed during a run, restarting");
            self.waiting_for_params_change = true;
            if self.runner.stop() {
                self.presenter.set_run_state(RunState::Stopping);
            }
        } else {
            self.save();
        }
    }

    fn select_suite(&mut self, suite: Arc<BenchmarkSuite>) {
        log::info!("[Controller] Selected suite '{}'", suite.title());
        self.settings.set_selected_suite(suite.title());
        self.selected_suite = Some(suite);
        self.refresh_chart();
        self.show_selection();
        self.refresh_runner_params();
    }

    fn step_suite(&mut self, step: isize) {
        let suites = self.runner.suites();
        if suites.is_empty() {
            return;
        }
        let current = self
            .selected_suite
            .as_ref()
            .and_then(|s| suites.iter().position(|c| c.title() == s.title()))
            .unwrap_or(0);
        let len = suites.len() as isize;
        let next = (current as isize + step).rem_euclid(len) as usize;
        let suite = Arc::clone(&suites[next]);
        self.select_suite(suite);
    }

    fn update_selection(&mut self, f: impl FnOnce(&mut BenchmarkSelection, &[String])) {
        let Some(suite) = self.selected_suite.clone() else {
            return;
        };
        let titles = suite.benchmark_titles();
        let selection = &mut self.runner.results_mut(suite.title()).selection;
        let before = selection.clone();
        f(selection, &titles);
        if *selection == before {
            return;
        }
        self.set_document_edited(true);
        self.refresh_chart();
        self.show_selection();
        self.refresh_runner_params();
    }

    fn show_selection(&mut self) {
        let Some(suite) = self.selected_suite.clone() else {
            return;
        };
        let titles = suite.benchmark_titles();
        let selection = self.runner.results(suite.title()).selection;
        let effective = selection.effective(&titles);
        let summary = SelectionSummary {
            suite: suite.title().to_string(),
            benchmarks: titles
                .iter()
                .map(|t| (t.clone(), effective.contains(t)))
                .collect(),
            label: selection_label(&effective, titles.len()),
            max_size: size_label(selection.scale_range.max_size()),
        };
        self.presenter.show_selection(&summary);
    }

    fn new_document(&mut self) {
        match self.runner.reset() {
            Ok(true) => {
                self.set_document_edited(false);
                self.refresh_chart();
            }
            Ok(false) => log::info!("[Controller] Reset ignored while {}", self.runner.state()),
            Err(e) => log::warn!("[Controller] Failed to reset results: {}", e),
        }
    }

    fn set_status(&mut self, status: String) {
        self.status = status;
        if self.scheduler.request(RefreshKind::Progress, clock_now()) == Dispatch::Now {
            self.presenter.show_status(&self.status);
        }
    }

    fn set_document_edited(&mut self, edited: bool) {
        if self.document_edited != edited {
            self.document_edited = edited;
            self.presenter.set_document_edited(edited);
        }
    }

    fn schedule_chart_refresh(&mut self) {
        if self.scheduler.request(RefreshKind::Chart, clock_now()) == Dispatch::Now {
            self.render_chart();
        }
    }

    /// Redraw now and drop any outstanding deferred redraw.
    fn refresh_chart(&mut self) {
        self.scheduler.mark_executed(RefreshKind::Chart, clock_now());
        self.render_chart();
    }

    fn render_chart(&mut self) {
        let Some(suite) = self.selected_suite.clone() else {
            return;
        };
        let results = self.runner.results(suite.title());
        let chart = self.renderer.render(&suite, &results, self.settings.amortized());
        self.presenter.show_chart(&chart);
    }

    fn schedule_save(&mut self) {
        if self.scheduler.request(RefreshKind::Save, clock_now()) == Dispatch::Now {
            self.save();
        }
    }

    /// Save now. Failures are logged and otherwise ignored.
    fn save(&mut self) {
        self.scheduler.cancel(RefreshKind::Save);
        match self.runner.save() {
            Ok(()) => self.set_document_edited(false),
            Err(e) => log::warn!("[Controller] Failed to save results: {}", e),
        }
    }
}

/// Current time on the tokio clock, so paused test time drives the scheduler.
fn clock_now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

async fn wait_for_deadline(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}
