//! Checkpoint action entry point
//!
//! Called once per completed checkpoint run. The process succeeds whatever
//! happens to the emission; the outcome is printed for the caller to inspect.

use eyre::Result;
use std::path::Path;

use crate::action::{ActionResult, CorrelatorAction};
use crate::cli::OutputFormat;
use crate::config::{Config, CorrelatorConfig, EmitOn};

pub fn run(
    input: Option<&Path>,
    endpoint: Option<String>,
    emit_on: Option<EmitOn>,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let settings = action_settings(&config.correlator, endpoint, emit_on);

    let result = match CorrelatorAction::from_config(&settings) {
        Err(e) => ActionResult::failed(e),
        Ok(action) => match super::read_document(input) {
            Ok(document) => action.run(&document),
            Err(e) => ActionResult::failed(format!("{:#}", e)),
        },
    };

    report(&result, format)
}

/// Print an action result in the requested format
pub fn report(result: &ActionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(result)?),
        OutputFormat::Text => println!("{}", result.format_display()),
    }
    Ok(())
}

/// Configured settings with command-line overrides applied
fn action_settings(base: &CorrelatorConfig, endpoint: Option<String>, emit_on: Option<EmitOn>) -> CorrelatorConfig {
    let mut settings = base.clone();
    if let Some(endpoint) = endpoint {
        settings.endpoint = Some(endpoint);
    }
    if let Some(emit_on) = emit_on {
        settings.emit_on = emit_on;
    }
    settings
}
