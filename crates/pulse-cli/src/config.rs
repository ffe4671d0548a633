//! Configuration file handling for pulse-cli

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use pulse_client::consumer::DEFAULT_RECONNECT_DELAY;
use pulse_client::DEFAULT_STREAM_PATH;

use crate::output::OutputFormat;

pub const DEFAULT_SERVER: &str = "http://localhost:3000";

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Default server URL
    pub server: Option<String>,
    /// Default stream path
    pub path: Option<String>,
    /// Default output format
    pub output: Option<OutputFormat>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// Wait before reconnecting, in milliseconds
    pub reconnect_delay_ms: Option<u64>,
}

/// Values given on the command line; `None` defers to the config file
#[derive(Debug, Clone, Default)]
pub struct ArgOverrides<'a> {
    pub server: Option<&'a str>,
    pub path: Option<&'a str>,
    pub output: Option<OutputFormat>,
    pub no_color: bool,
    pub reconnect_delay_ms: Option<u64>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("pulse-cli");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: &ArgOverrides<'_>) -> MergedConfig {
        MergedConfig {
            server: args
                .server
                .map(String::from)
                .or_else(|| self.server.clone())
                .unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            path: args
                .path
                .map(String::from)
                .or_else(|| self.path.clone())
                .unwrap_or_else(|| DEFAULT_STREAM_PATH.to_string()),
            output: args.output.or(self.output).unwrap_or_default(),
            no_color: args.no_color || self.no_color.unwrap_or(false),
            reconnect_delay: args
                .reconnect_delay_ms
                .or(self.reconnect_delay_ms)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_RECONNECT_DELAY),
        }
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone, PartialEq)]
pub struct MergedConfig {
    pub server: String,
    pub path: String,
    pub output: OutputFormat,
    pub no_color: bool,
    pub reconnect_delay: Duration,
}
