//! Kuteera Kitchen session client

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "kuteera")]
#[command(about = "Sign in to Kuteera Kitchen and manage the session")]
#[command(version)]
struct Cli {
    /// Set logging level (overrides the configured level)
    #[arg(short = 'l', long, global = true)]
    log_level: Option<LogLevel>,

    /// Data directory for the session file and logs
    #[arg(short = 'd', long, global = true, env = "KUTEERA_STATE_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to ./kuteera.toml when present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Timeout for one-shot commands in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "30")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = config::load(cli.config.as_deref(), cli.data_dir.clone())?;
    let level = cli
        .log_level
        .map_or_else(|| settings.config.logging.level.clone(), LogLevel::as_filter);
    let file_log = settings.config.logging.file && !cli.no_file_log;
    logging::init_logging(&level, &settings.data_dir, file_log)?;

    info!(base_url = %settings.config.api.base_url, "Starting Kuteera client");

    let long_running = cli.command.is_long_running();
    let run = cli.command.execute(settings);

    // Session watching runs until the session ends, so it is never timed out
    let outcome = if cli.timeout == 0 || long_running {
        Ok(run.await)
    } else {
        tokio::time::timeout(Duration::from_secs(cli.timeout), run).await
    };

    match outcome {
        Ok(Ok(())) => {
            info!("Command completed successfully");
        }
        Ok(Err(e)) => {
            error!("Command failed: {e:#}");
            std::process::exit(1);
        }
        Err(_) => {
            error!("Command timed out after {} seconds", cli.timeout);
            std::process::exit(1);
        }
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> String {
        Level::from(self).as_str().to_lowercase()
    }
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
