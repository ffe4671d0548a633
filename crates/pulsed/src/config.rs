//! Daemon configuration file
//!
//! Every section and key is optional; missing values fall back to the
//! producer defaults.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 3000
//!
//! [stream]
//! path = "/api/sse"
//! tick_interval_ms = 1000
//! keep_alive_secs = 15   # 0 disables keep-alive comments
//!
//! [logging]
//! format = "text"        # or "json"
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use pulse_api::config::{DEFAULT_KEEP_ALIVE, DEFAULT_STREAM_PATH, DEFAULT_TICK_INTERVAL};
use pulse_api::ProducerConfig;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub server: ServerSection,
    pub stream: StreamSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind: IpAddr,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamSection {
    pub path: String,
    pub tick_interval_ms: u64,
    pub keep_alive_secs: u64,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            path: DEFAULT_STREAM_PATH.to_string(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
            keep_alive_secs: DEFAULT_KEEP_ALIVE.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl DaemonConfig {
    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.stream.path.starts_with('/') {
            bail!("stream.path must start with '/': {}", self.stream.path);
        }
        if self.stream.path == "/health" {
            bail!("stream.path must not shadow /health");
        }
        if self.stream.tick_interval_ms == 0 {
            bail!("stream.tick_interval_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind, self.server.port)
    }

    pub fn producer_config(&self) -> ProducerConfig {
        let keep_alive = match self.stream.keep_alive_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        ProducerConfig::default()
            .with_path(self.stream.path.clone())
            .with_tick_interval(Duration::from_millis(self.stream.tick_interval_ms))
            .with_keep_alive(keep_alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = DaemonConfig::from_toml("").unwrap();
        assert_eq!(config, DaemonConfig::default());
        assert_eq!(config.socket_addr(), "0.0.0.0:3000".parse().unwrap());

        let producer = config.producer_config();
        assert_eq!(producer.path, "/api/sse");
        assert_eq!(producer.tick_interval, Duration::from_millis(1000));
        assert_eq!(producer.keep_alive, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_full_file() {
        let config = DaemonConfig::from_toml(
            r#"
            [server]
            bind = "127.0.0.1"
            port = 8080

            [stream]
            path = "/events"
            tick_interval_ms = 250
            keep_alive_secs = 0

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.socket_addr(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.logging.format, LogFormat::Json);

        let producer = config.producer_config();
        assert_eq!(producer.path, "/events");
        assert_eq!(producer.tick_interval, Duration::from_millis(250));
        assert_eq!(producer.keep_alive, None);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = DaemonConfig::from_toml("[server]\nport = 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.stream, StreamSection::default());
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(DaemonConfig::from_toml("[stream]\ntick_interval_ms = 0\n").is_err());
        assert!(DaemonConfig::from_toml("[stream]\npath = \"events\"\n").is_err());
        assert!(DaemonConfig::from_toml("[stream]\npath = \"/health\"\n").is_err());
        assert!(DaemonConfig::from_toml("[server]\nprot = 1\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[stream]\ntick_interval_ms = 500").unwrap();

        let config = DaemonConfig::load(file.path()).unwrap();
        assert_eq!(config.stream.tick_interval_ms, 500);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = DaemonConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
