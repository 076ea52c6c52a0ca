use clap::ValueEnum;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "ge-correlator.yaml";
pub const DEFAULT_JOB_NAMESPACE: &str = "great_expectations://default";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Main ge-correlator configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub correlator: CorrelatorConfig,
    pub log_level: LogLevel,
}

/// Which checkpoint outcomes produce events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmitOn {
    /// Every checkpoint run
    #[default]
    All,
    /// Only runs where every validation passed
    Success,
    /// Only runs with at least one failed validation
    Failure,
}

impl EmitOn {
    pub fn allows(self, checkpoint_success: bool) -> bool {
        match self {
            EmitOn::All => true,
            EmitOn::Success => checkpoint_success,
            EmitOn::Failure => !checkpoint_success,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmitOn::All => "all",
            EmitOn::Success => "success",
            EmitOn::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrelatorConfig {
    /// Full URL of Correlator's lineage events endpoint
    pub endpoint: Option<String>,
    /// Sent as `X-API-Key` when set
    pub api_key: Option<String>,
    pub emit_on: EmitOn,
    /// OpenLineage job namespace for emitted events
    pub job_namespace: String,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            emit_on: EmitOn::default(),
            job_namespace: DEFAULT_JOB_NAMESPACE.to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Configuration problems that prevent building an action
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("correlator endpoint is required (set correlator.endpoint or CORRELATOR_ENDPOINT)")]
    MissingEndpoint,

    #[error("correlator timeout must be at least one second")]
    InvalidTimeout,
}

impl CorrelatorConfig {
    /// The configured endpoint, required for emission
    pub fn endpoint(&self) -> Result<&str, ConfigError> {
        self.endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or(ConfigError::MissingEndpoint)
    }

    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        if self.timeout == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(Duration::from_secs(self.timeout))
    }

    /// Copy with the API key hidden, for display
    pub fn masked(&self) -> Self {
        Self {
            api_key: self.api_key.as_ref().map(|_| "********".to_string()),
            ..self.clone()
        }
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()))?
            }
            None => Self::load_discovered(),
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn load_discovered() -> Self {
        for path in Self::candidates() {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => log::warn!("Failed to load config from {}: {}", path.display(), e),
            }
        }

        log::info!("No config file found, using defaults");
        Self::default()
    }

    /// Config file locations in lookup order
    pub fn candidates() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(env_path) = std::env::var("GE_CORRELATOR_CONFIG") {
            paths.push(Self::expand_path(Path::new(&env_path)));
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("ge-correlator").join(CONFIG_FILE_NAME));
        }
        paths.push(PathBuf::from(CONFIG_FILE_NAME));

        paths
    }

    /// The file `load` would read, if any
    pub fn source(config_path: Option<&PathBuf>) -> Option<PathBuf> {
        match config_path {
            Some(path) => Some(path.clone()),
            None => Self::candidates().into_iter().find(|p| p.exists()),
        }
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Expand `$VAR` references in string values and apply `CORRELATOR_*` overrides
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let correlator = &mut self.correlator;

        if let Some(endpoint) = lookup("CORRELATOR_ENDPOINT").filter(|v| !v.is_empty()) {
            correlator.endpoint = Some(endpoint);
        }
        if let Some(api_key) = lookup("CORRELATOR_API_KEY").filter(|v| !v.is_empty()) {
            correlator.api_key = Some(api_key);
        }

        for value in [&mut correlator.endpoint, &mut correlator.api_key].into_iter().flatten() {
            *value = Self::expand_value(value, &lookup);
        }
        correlator.job_namespace = Self::expand_value(&correlator.job_namespace, &lookup);
    }

    /// Expand environment references, leaving unknown variables untouched
    pub fn expand_value<F>(value: &str, lookup: &F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        shellexpand::env_with_context_no_errors(value, |name| lookup(name)).into_owned()
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}
