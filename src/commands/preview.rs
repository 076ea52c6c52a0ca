//! Show the events a checkpoint result would produce

use colored::*;
use eyre::{Context, Result};
use std::path::Path;

use crate::checkpoint::CheckpointRun;
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::lineage::EventBuilder;

pub fn run(input: Option<&Path>, namespace: Option<String>, format: OutputFormat, config: &Config) -> Result<()> {
    let document = super::read_document(input)?;
    let run = CheckpointRun::from_document(&document).context("Failed to read checkpoint result")?;

    let namespace = namespace.unwrap_or_else(|| config.correlator.job_namespace.clone());
    let events = EventBuilder::new(namespace).build(&run);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&events)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&events)?),
        OutputFormat::Text => {
            let status = if run.success { "passed".green() } else { "failed".red() };
            println!(
                "{} {} ({} validations, checkpoint {})",
                "Checkpoint".bold(),
                run.checkpoint_name.as_deref().unwrap_or("<unnamed>").cyan(),
                run.validations.len(),
                status
            );
            println!();

            if events.is_empty() {
                println!("  {} No validations, nothing to emit", "⚠".yellow());
            }
            for event in &events {
                println!("  {}", event.format_display());
            }
        }
    }

    Ok(())
}
