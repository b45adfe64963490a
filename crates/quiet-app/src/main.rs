//! Quiet Hours - recurring quiet windows with notifications.
//!
//! This is the main binary:
//! - Window management (add, edit, toggle, remove, list)
//! - Status at the current or any given instant
//! - The notification monitor (one tick, or a foreground loop)

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use quiet_app::commands::{self, AddArgs, ConfigAction, EditArgs};
use quiet_app::{MonitorConfig, Monitor};
use quiet_storage::Database;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Quiet Hours - recurring quiet windows with start, end and reminder notifications
#[derive(Parser, Debug)]
#[command(name = "quiet", version, about)]
struct Args {
    /// Database file (defaults to the app data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List windows
    List,
    /// Show which windows are active
    Status {
        /// Evaluate at "<day> HH:MM" instead of now, e.g. "mon 23:30"
        #[arg(long)]
        at: Option<String>,
    },
    /// Add a window
    Add(AddArgs),
    /// Change a window
    Edit(EditArgs),
    /// Enable or disable a window
    Toggle {
        /// Window id
        id: i64,
    },
    /// Delete a window
    Remove {
        /// Window id
        id: i64,
    },
    /// Show recent activity
    Logs {
        /// Delete entries older than this many days instead
        #[arg(long)]
        prune_days: Option<u32>,
    },
    /// Run one notification pass and print the report
    Tick,
    /// Run the notification monitor until interrupted
    Run,
    /// Show or change the monitor configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "quiet-hours", "quiet-hours").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
///
/// Console output goes to stderr so command output on stdout stays clean.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "quiet={0},quiet_app={0},quiet_core={0},quiet_storage={0},warn",
            log_level
        ))
    });

    let console = args.debug || matches!(args.command, Command::Run);

    // Try to set up file logging
    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            // Create rolling file appender (rotates daily, keeps files)
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("quiet")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                if console {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(io::stderr))
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                } else {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                }

                tracing::debug!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

fn open_database(args: &Args) -> anyhow::Result<Database> {
    let db = match &args.db {
        Some(path) => Database::with_path(path),
        None => Database::new(),
    }
    .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;
    Ok(db)
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep guard alive for the duration of the program
    let _log_guard = init_logging(&args);
    tracing::debug!("Args: {:?}", args);

    let db = open_database(&args)?;
    let config = MonitorConfig::load(&db)?;
    let mut out = io::stdout().lock();

    match args.command {
        Command::List => commands::list(&db, &config, &mut out)?,
        Command::Status { at } => commands::status(&db, &config, at.as_deref(), &mut out)?,
        Command::Add(add) => {
            commands::add(&db, &config, add, &mut out)?;
        }
        Command::Edit(edit) => {
            commands::edit(&db, edit, &mut out)?;
        }
        Command::Toggle { id } => {
            commands::toggle(&db, id, &mut out)?;
        }
        Command::Remove { id } => commands::remove(&db, id, &mut out)?,
        Command::Logs { prune_days } => commands::logs(&db, &config, prune_days, &mut out)?,
        Command::Tick => commands::tick(&Monitor::new(db, config), &mut out)?,
        Command::Run => {
            tracing::info!("Starting quiet hours monitor");
            Monitor::new(db, config).run(shutdown_signal()).await;
        }
        Command::Config { action } => commands::config(&db, action, &mut out)?,
    }

    Ok(())
}
