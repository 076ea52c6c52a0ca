//! Subcommand implementations

use eyre::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

pub mod completions;
pub mod config;
pub mod preview;
pub mod run;

/// Read a checkpoint result document from a file, or stdin when no path is given
pub fn read_document(input: Option<&Path>) -> Result<Value> {
    let content = match input {
        Some(path) => fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read checkpoint result from stdin")?;
            buffer
        }
    };

    serde_json::from_str(&content).context("Failed to parse checkpoint result JSON")
}
