//! Console front end: a line-oriented presenter and the command parser.

use super::{Command, Presenter, SelectionSummary};
use crate::orchestrator::RunState;
use crate::render::ChartArtifact;
use std::io::{self, Write};

/// Help text listing every console command.
pub const HELP: &str = "\
commands:
  run | r              start when idle, stop when running
  start | stop
  suite <title>        select a suite
  next | n, prev | p   cycle through suites
  toggle <benchmark>   toggle one benchmark in the selection
  only <benchmark>     select a single benchmark
  all                  select every benchmark
  max <scale>          largest input size is 2^scale
  + | -                grow or shrink the largest input size
  amortized on|off     chart time per element
  randomize on|off     shuffle generated inputs
  new                  clear all results (idle only)
  save
  quit | q";

/// Writes presenter output as plain lines.
pub struct ConsolePresenter<W: Write + Send = io::Stdout> {
    out: W,
    edited: bool,
}

impl ConsolePresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        ConsolePresenter { out, edited: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            log::debug!("[Console] Write failed: {}", e);
        }
    }
}

impl<W: Write + Send> Presenter for ConsolePresenter<W> {
    fn show_status(&mut self, status: &str) {
        let marker = if self.edited { "*" } else { " " };
        self.line(&format!("{} {}", marker, status));
    }

    fn show_chart(&mut self, chart: &ChartArtifact) {
        self.line(&format!("== {} ==", chart.title));
        self.line(chart.body.trim_end());
    }

    fn set_document_edited(&mut self, edited: bool) {
        self.edited = edited;
    }

    fn set_run_state(&mut self, state: RunState) {
        log::debug!("[Console] Run state: {}", state);
    }

    fn show_selection(&mut self, summary: &SelectionSummary) {
        let marks: Vec<String> = summary
            .benchmarks
            .iter()
            .map(|(title, on)| format!("[{}] {}", if *on { 'x' } else { ' ' }, title))
            .collect();
        self.line(&format!(
            "{}: {} (up to {}) {}",
            summary.suite,
            summary.label,
            summary.max_size,
            marks.join(" ")
        ));
    }
}

/// Parse one console line into a [`Command`].
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let need_arg = |name: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("'{}' needs an argument", name))
        } else {
            Ok(rest.to_string())
        }
    };

    let cmd = match word.to_ascii_lowercase().as_str() {
        "run" | "r" => Command::Run,
        "start" => Command::Start,
        "stop" => Command::Stop,
        "suite" => Command::SelectSuite(need_arg("suite")?),
        "next" | "n" => Command::NextSuite,
        "prev" | "p" => Command::PreviousSuite,
        "toggle" => Command::ToggleBenchmark(need_arg("toggle")?),
        "only" => Command::SelectBenchmark(need_arg("only")?),
        "all" => Command::SelectAllBenchmarks,
        "max" => {
            let arg = need_arg("max")?;
            let scale = arg
                .parse::<u32>()
                .map_err(|_| format!("invalid scale '{}'", arg))?;
            Command::SetMaxScale(scale)
        }
        "+" => Command::IncreaseMaxScale,
        "-" => Command::DecreaseMaxScale,
        "amortized" => Command::SetAmortized(parse_switch(rest)?),
        "randomize" => Command::SetRandomizeInputs(parse_switch(rest)?),
        "new" => Command::NewDocument,
        "save" => Command::Save,
        "quit" | "q" | "exit" => Command::Quit,
        "" => return Err("empty command".to_string()),
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(cmd)
}

fn parse_switch(arg: &str) -> Result<bool, String> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(format!("expected on/off, got '{}'", other)),
    }
}
