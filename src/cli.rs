use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::config::EmitOn;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "ge-correlator",
    about = "Emit Great Expectations checkpoint results as OpenLineage events to Correlator",
    version,
    after_help = "Logs are written to: ~/.local/share/ge-correlator/logs/ge-correlator.log\n\nDocumentation: https://github.com/correlator-io/correlator-ge"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to ge-correlator.yaml config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Log at debug level")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Emit events for a completed checkpoint result (checkpoint action entry point)
    Run {
        /// Checkpoint result JSON file (reads stdin when omitted)
        input: Option<PathBuf>,

        /// Override the configured Correlator endpoint
        #[arg(long)]
        endpoint: Option<String>,

        /// Override the configured emission policy
        #[arg(long, value_enum)]
        emit_on: Option<EmitOn>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print the events a checkpoint result would produce, without sending them
    Preview {
        /// Checkpoint result JSON file (reads stdin when omitted)
        input: Option<PathBuf>,

        /// Override the configured job namespace
        #[arg(long)]
        namespace: Option<String>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show effective configuration (API key masked)
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print the path of the config file in use
    Path,
}
