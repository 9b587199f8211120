//! Checkbar - checklist progress bar for markdown documents.
//!
//! # Commands
//!
//! - `checkbar scan <FILE>`: Print the task count of a document once
//! - `checkbar watch <FILE>`: Keep a progress bar in step with a document
//! - `checkbar settings`: Print the effective settings, or reset them
//!
//! # Environment Variables
//!
//! See the [`config`](checkbar_monitor::config) module for available options.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use checkbar_monitor::config::Config;
use checkbar_monitor::content::{ContentSource, FsContentSource};
use checkbar_monitor::events::HostEvent;
use checkbar_monitor::scanner::scan_tasks;
use checkbar_monitor::scheduler::SchedulerConfig;
use checkbar_monitor::session::{Session, StaticModeProbe};
use checkbar_monitor::settings::Settings;
use checkbar_monitor::tui::{install_panic_hook, TerminalPanel};
use checkbar_monitor::types::ViewMode;
use checkbar_monitor::view::{LogPanel, ViewRegistry};
use checkbar_monitor::watcher::DocumentWatcher;

/// Capacity of the watcher-to-session channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Checkbar - checklist progress bar for markdown documents.
///
/// Counts `- [ ]` and `- [x]` items and shows how many are done.
#[derive(Parser, Debug)]
#[command(name = "checkbar")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    CHECKBAR_SETTINGS_PATH     Settings file (default: <config dir>/checkbar/settings.json)
    CHECKBAR_DEBOUNCE_MS       Debounce delay for edits
    CHECKBAR_READING_DELAY_MS  Refresh delay in reading mode
    CHECKBAR_MAX_RETRIES       Staleness retries after a toggle (1-10)
    RUST_LOG                   Log filter (default: info)

EXAMPLES:
    # Count tasks once
    checkbar scan notes/todo.md

    # Show a live progress bar
    checkbar watch notes/todo.md

    # Log progress instead of drawing a bar
    checkbar watch notes/todo.md --headless
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Print the task count of a document.
    Scan {
        /// Markdown document to scan.
        file: PathBuf,
    },

    /// Watch a document and keep its progress bar up to date.
    ///
    /// Runs until Ctrl+C or SIGTERM.
    Watch {
        /// Markdown document to watch.
        file: PathBuf,

        /// Treat the document as shown in reading mode.
        #[arg(short, long)]
        reading: bool,

        /// Log progress instead of drawing a bar.
        #[arg(long)]
        headless: bool,
    },

    /// Print the effective settings as JSON.
    Settings {
        /// Overwrite the settings file with defaults.
        #[arg(long)]
        reset: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Scan { file } => run_scan(&file),
        Command::Settings { reset } => run_settings(reset),
        Command::Watch {
            file,
            reading,
            headless,
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;

            runtime.block_on(run_watch(file, reading, headless))
        }
    }
}

/// Runs the scan command.
fn run_scan(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    println!("{}", scan_tasks(&text));
    Ok(())
}

/// Runs the settings command.
fn run_settings(reset: bool) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    if reset {
        Settings::default()
            .save(&config.settings_path)
            .context("Failed to write default settings")?;
        eprintln!("Settings reset: {}", config.settings_path.display());
        return Ok(());
    }

    let settings = load_settings(&config)?;
    println!("{}", settings.to_json()?);
    Ok(())
}

/// Loads persisted settings and applies environment overrides.
fn load_settings(config: &Config) -> Result<Settings> {
    let mut settings = Settings::load(&config.settings_path).with_context(|| {
        format!(
            "Failed to load settings from {}",
            config.settings_path.display()
        )
    })?;
    config.apply_to(&mut settings);
    settings
        .validate()
        .context("Invalid settings after environment overrides")?;
    Ok(settings)
}

/// Runs the watch command.
async fn run_watch(file: PathBuf, reading: bool, headless: bool) -> Result<()> {
    // The bar owns stdout; keep logs quiet unless asked for.
    init_logging(if headless { "info" } else { "warn" });

    let config = Config::from_env().context("Failed to load configuration")?;
    let settings = load_settings(&config)?;

    info!(
        settings_path = %config.settings_path.display(),
        debounce_ms = settings.debounce_time_ms,
        max_retries = settings.max_retries,
        "Configuration loaded"
    );

    let (event_tx, mut event_rx) = mpsc::channel::<HostEvent>(EVENT_CHANNEL_CAPACITY);
    let watcher = DocumentWatcher::new(&file, event_tx)
        .with_context(|| format!("Failed to watch {}", file.display()))?;
    let doc = watcher.document().clone();

    let source = Arc::new(FsContentSource::new());
    source.open(doc.clone());

    let terminal = if headless {
        None
    } else {
        install_panic_hook();
        Some(Arc::new(
            TerminalPanel::new(settings.clone()).context("Failed to initialize terminal")?,
        ))
    };
    let views = match &terminal {
        Some(panel) => ViewRegistry::new().with_panel(panel.clone()),
        None => ViewRegistry::new().with_panel(Arc::new(LogPanel)),
    };

    let mode = if reading {
        ViewMode::Reading
    } else {
        ViewMode::Editing
    };
    let session = Session::new(
        source.clone(),
        views,
        Box::new(StaticModeProbe(mode)),
        SchedulerConfig::from(&settings),
    );

    info!(document = %doc, %mode, "Watching document. Press Ctrl+C to stop.");
    session.handle(HostEvent::DocumentOpened(doc.clone()));

    loop {
        tokio::select! {
            _ = wait_for_shutdown() => {
                info!("Shutdown signal received");
                break;
            }

            event = event_rx.recv() => {
                let Some(event) = event else {
                    warn!("Watcher channel closed");
                    break;
                };
                if event == HostEvent::DocumentClosed {
                    source.close();
                } else if source.active_document().is_none() {
                    // Recreated after a removal.
                    source.open(doc.clone());
                }
                if session.handle(event).is_none() {
                    debug!("Event ignored");
                }
            }
        }
    }

    info!("Shutting down...");
    session.shutdown();
    drop(watcher);

    if let Some(panel) = terminal {
        panel.close().context("Failed to restore terminal")?;
    }

    Ok(())
}

/// Initializes the logging subsystem, writing to stderr.
fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
