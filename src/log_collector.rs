//! Decoupled logging pipeline for benchmark sessions.
//!
//! Every `log::*!` call in the process ends up here once the collector is
//! installed as the global logger. Records are pushed onto an unbounded
//! channel and persisted by a background thread, so logging from the
//! benchmark worker never blocks on disk I/O.
//!
//! # Architecture
//!
//! ```text
//! log::info!() (any thread)
//!     |
//! [LogCollector] (non-blocking send)
//!     | (crossbeam unbounded channel)
//!     v
//! [disk writer thread] ---> <log_dir>/bench_<timestamp>.log
//!     |
//!     +--> stderr (records at or above the echo level)
//! ```
//!
//! A flush marker sent down the same channel lets callers wait until every
//! record sent before it has reached the file.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

enum LogMessage {
    Line(LogLine),
    /// Signals the sender once everything queued before it is written.
    Flush(std::sync::mpsc::Sender<()>),
}

/// A formatted log record.
#[derive(Clone, Debug)]
pub struct LogLine {
    pub level: Level,
    pub message: String,
    /// `HH:MM:SS.mmm`, local time.
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        LogLine {
            level,
            message: message.into(),
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    fn format(&self) -> String {
        format!("[{}] [{}] {}\n", self.timestamp, self.level, self.message)
    }
}

/// Unified logger writing one file per session.
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    session_path: PathBuf,
    level: LevelFilter,
}

impl LogCollector {
    /// Create the log directory and session file, and start the writer thread.
    ///
    /// Records above `level` are discarded; records at or above `echo` are
    /// also written to stderr.
    pub fn new(log_dir: &Path, level: LevelFilter, echo: LevelFilter) -> io::Result<Self> {
        std::fs::create_dir_all(log_dir)?;
        let session_path = new_session_path(log_dir);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&session_path)?;

        let (tx, rx) = unbounded::<LogMessage>();

        std::thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    match msg {
                        LogMessage::Line(line) => {
                            let formatted = line.format();
                            let _ = file.write_all(formatted.as_bytes());
                            if line.level <= echo {
                                eprint!("{}", formatted);
                            }
                        }
                        LogMessage::Flush(done) => {
                            let _ = file.flush();
                            let _ = file.sync_data();
                            let _ = done.send(());
                        }
                    }
                }
                let _ = file.flush();
            })?;

        Ok(LogCollector {
            tx,
            session_path,
            level,
        })
    }

    pub fn session_log_path(&self) -> &Path {
        &self.session_path
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Queue a line. Never blocks.
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Block until every line queued so far is on disk.
    pub fn flush_blocking(&self) -> Result<(), String> {
        let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
        self.tx
            .send(LogMessage::Flush(done_tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        done_rx
            .recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }

    /// Async form of [`flush_blocking`](Self::flush_blocking) that keeps the
    /// runtime's worker threads free while waiting.
    pub async fn wait_for_empty(&self) -> Result<(), String> {
        let collector = self.clone();
        tokio::task::spawn_blocking(move || collector.flush_blocking())
            .await
            .map_err(|e| format!("Flush task failed: {}", e))?
    }

    /// Install a clone of this collector as the global `log` backend.
    pub fn install(&self) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(self.clone()))?;
        log::set_max_level(self.level);
        Ok(())
    }
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.log_line(LogLine::new(record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {
        let _ = self.flush_blocking();
    }
}

fn new_session_path(log_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let mut path = log_dir.join(format!("bench_{}.log", timestamp));
    // Two sessions in the same second get distinct files.
    let mut n = 1;
    while path.exists() {
        path = log_dir.join(format!("bench_{}_{}.log", timestamp, n));
        n += 1;
    }
    if File::create(&path).is_err() {
        log::debug!("[Log] Could not pre-create {}", path.display());
    }
    path
}
