use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod action;
mod checkpoint;
mod cli;
mod commands;
mod config;
mod extract;
mod lineage;
mod observability;

use cli::{Cli, Commands};
use config::{Config, LogLevel};

fn log_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ge-correlator")
        .join("logs")
        .join("ge-correlator.log")
}

fn setup_logging(log_level: LogLevel) -> Result<()> {
    let log_file = log_file();
    if let Some(log_dir) = log_file.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(log_level.to_level_filter());
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run {
            input,
            endpoint,
            emit_on,
            format,
        } => commands::run::run(input.as_deref(), endpoint, emit_on, cli::OutputFormat::resolve(format), &config),
        Commands::Preview {
            input,
            namespace,
            format,
        } => commands::preview::run(input.as_deref(), namespace, cli::OutputFormat::resolve(format), &config),
        Commands::Config { action } => commands::config::run(action, cli.config.as_ref(), &config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        // The checkpoint action reports a broken config instead of failing the checkpoint
        Err(e) => match cli.command {
            Commands::Run { format, .. } => {
                let result = action::ActionResult::failed(format!("Failed to load configuration: {:#}", e));
                return commands::run::report(&result, cli::OutputFormat::resolve(format));
            }
            _ => return Err(e).context("Failed to load configuration"),
        },
    };

    let log_level = if cli.verbose { LogLevel::Debug } else { config.log_level };
    if let Err(e) = setup_logging(log_level) {
        // A checkpoint action must keep working without a writable log directory
        eprintln!("ge-correlator: logging disabled: {:#}", e);
    }

    info!("Starting ge-correlator with config from: {:?}", cli.config);

    run(cli, config).context("Command failed")?;

    Ok(())
}
