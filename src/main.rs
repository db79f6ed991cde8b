use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use collection_bench::config::loader::{load_or_default, DEFAULT_CONFIG_PATH};
use collection_bench::orchestrator::{Runner, RunnerConfig};
use collection_bench::results::JsonResultsStore;
use collection_bench::ui::threading::{spawn_stdin_reader, CommandBridge};
use collection_bench::ui::{AppController, Command, ConsolePresenter};
use collection_bench::{BenchConfig, CollectionSuites, LogCollector, SettingsManager, TableRenderer};

/// Benchmark collection data structures across growing input sizes.
#[derive(Parser, Debug)]
#[command(name = "collection_bench", version, about)]
struct Args {
    /// Bench config file (TOML). Defaults apply when it does not exist.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Suite to select at startup.
    #[arg(long)]
    suite: Option<String>,

    /// Feed benchmarks shuffled inputs.
    #[arg(long)]
    randomize: Option<bool>,

    /// Largest input size as a power of two.
    #[arg(long)]
    max_scale: Option<u32>,

    /// Run the selected suite once and exit instead of reading commands.
    #[arg(long)]
    run_once: bool,

    /// Override the results file.
    #[arg(long)]
    results: Option<PathBuf>,

    /// Override the settings file.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override the log directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log debug records.
    #[arg(short, long)]
    verbose: bool,
}

/// Load the bench config, apply command line overrides and start logging.
fn setup(args: &Args) -> collection_bench::Result<(BenchConfig, LogCollector)> {
    let mut config = load_or_default(&args.config)?;
    if let Some(path) = args.results.clone() {
        config.results_path = path;
    }
    if let Some(path) = args.settings.clone() {
        config.settings_path = path;
    }
    if let Some(dir) = args.log_dir.clone() {
        config.log_dir = dir;
    }

    // =========================================================================
    // LOGGING INITIALIZATION - MUST BE FIRST
    // =========================================================================
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let log_collector = LogCollector::new(&config.log_dir, level, LevelFilter::Warn)?;
    if let Err(e) = log_collector.install() {
        eprintln!("[Main] WARNING: Failed to set LogCollector as global logger: {}", e);
    }
    Ok((config, log_collector))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (config, log_collector) = setup(&args).context("Startup failed")?;
    log::info!(
        "[Main] collection_bench {} started, session log {}",
        collection_bench::VERSION,
        log_collector.session_log_path().display()
    );

    // =========================================================================
    // CORE SETUP
    // =========================================================================
    let settings = SettingsManager::load(&config.settings_path);
    if let Some(randomize) = args.randomize {
        settings.set_randomize_inputs(randomize);
    }

    let store = JsonResultsStore::load(&config.results_path);
    let (runner, events) = Runner::new(&CollectionSuites, Box::new(store), RunnerConfig::from(&config));

    let controller = AppController::new(
        runner,
        events,
        settings,
        Box::new(TableRenderer),
        Box::new(ConsolePresenter::stdout()),
        &config,
    )
    .with_exit_on_idle(args.run_once);

    let (bridge, command_rx) = CommandBridge::new();
    if let Some(suite) = args.suite {
        bridge.send(Command::SelectSuite(suite)).await?;
    }
    if let Some(scale) = args.max_scale {
        bridge.send(Command::SetMaxScale(scale)).await?;
    }

    // Keep a sender alive in one-shot mode so the loop ends on idle, not on EOF.
    let _one_shot_sender = if args.run_once {
        bridge.send(Command::Start).await?;
        Some(bridge.clone())
    } else {
        println!("type 'help' for commands");
        spawn_stdin_reader(bridge).context("Failed to start the console reader")?;
        None
    };

    controller.run(command_rx).await;

    if let Err(e) = log_collector.wait_for_empty().await {
        eprintln!("[Main] WARNING: Failed to flush logs: {}", e);
    }
    Ok(())
}
