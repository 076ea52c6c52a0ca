use colored::*;
use eyre::Result;
use std::path::PathBuf;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;

pub fn run(action: ConfigAction, explicit: Option<&PathBuf>, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Path => path(explicit),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    let masked = Config {
        correlator: config.correlator.masked(),
        ..config.clone()
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&masked)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(&masked)?);
        }
        OutputFormat::Text => {
            let correlator = &masked.correlator;
            let unset = "(not set)".dimmed().to_string();

            println!("{}", "ge-correlator Configuration".bold());
            println!();

            println!("{}:", "correlator".cyan());
            println!("  endpoint: {}", correlator.endpoint.clone().unwrap_or_else(|| unset.clone()));
            println!("  api_key: {}", correlator.api_key.clone().unwrap_or_else(|| unset.clone()));
            println!("  emit_on: {}", correlator.emit_on.as_str());
            println!("  job_namespace: {}", correlator.job_namespace);
            println!("  timeout: {}s", correlator.timeout);
            println!();

            println!("{}: {}", "log_level".cyan(), masked.log_level.as_filter());
        }
    }

    Ok(())
}

fn path(explicit: Option<&PathBuf>) -> Result<()> {
    match Config::source(explicit) {
        Some(path) => println!("{}", path.display()),
        None => {
            eprintln!("{} No config file found, using defaults", "⚠".yellow());
            for candidate in Config::candidates() {
                eprintln!("  searched: {}", candidate.display());
            }
        }
    }
    Ok(())
}
