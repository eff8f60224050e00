//! # Foxia Fleet - Terminal Console for Browser Profiles
//!
//! Launches, stops and monitors a fleet of isolated browser profiles.
//! Keeps per-profile lifecycle state consistent with the host's push events,
//! polls traffic metrics while anything runs, and renders the fleet as a
//! virtualized list with two-way selection sync.

mod app;
mod config;
pub mod constants;
mod fleet;
mod host;
mod models;
mod store;
mod ui;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use config::Config;
use constants::{log_dir, MIN_POLL_INTERVAL_MS};

/// Foxia Fleet - launch, stop and monitor browser profiles
#[derive(Parser, Debug)]
#[command(name = "foxia-fleet", version, about = "Terminal console for a fleet of isolated browser profiles")]
struct Cli {
    /// Directory holding one <uuid>/metadata.json per profile
    #[arg(long, value_name = "DIR")]
    profiles_dir: Option<PathBuf>,

    /// Color theme (default, gruvbox, nord, or a custom theme file name)
    #[arg(long, short = 't')]
    theme: Option<String>,

    /// Metrics polling interval in milliseconds
    #[arg(long, short = 'p', value_name = "MS")]
    poll_interval: Option<u64>,

    /// Run without a terminal UI and print a fleet summary
    #[arg(long)]
    headless: bool,

    /// Write logs to stderr instead of the log directory
    #[arg(long)]
    log_stderr: bool,

    /// Mark a browser kind as mid-update; its profiles cannot launch (repeatable)
    #[arg(long, value_name = "BROWSER")]
    updating: Vec<String>,
}

/// Install the global subscriber. `FOXIA_LOG` wins over `RUST_LOG`; the
/// default level is info. File logging returns the guard that flushes the
/// non-blocking writer and must outlive the program.
fn init_logging(to_stderr: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_env("FOXIA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if to_stderr {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
        return None;
    }

    // The terminal UI owns stdout, so logs go to a daily file.
    let _ = std::fs::create_dir_all(log_dir());
    let appender = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("foxia-fleet")
        .filename_suffix("log")
        .max_log_files(14)
        .build(log_dir())
    {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("log file unavailable ({e}), logging disabled");
            return None;
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Some(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_stderr);

    // Load and apply CLI overrides to config
    let mut config = Config::load();
    if let Some(dir) = cli.profiles_dir {
        config.profiles_dir = dir;
    }
    if let Some(ms) = cli.poll_interval {
        config.poll_interval_ms = ms.max(MIN_POLL_INTERVAL_MS);
    }
    if let Some(theme_name) = cli.theme {
        config.theme = theme_name;
    }
    config
        .host
        .updating
        .extend(cli.updating.into_iter().filter(|b| !b.is_empty()));

    if cli.headless {
        return app::run_headless(&config).await;
    }

    let mut app = app::App::new(&config)?;
    app.run().await
}
