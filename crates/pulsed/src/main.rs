//! pulsed - Pulse Server Daemon
//!
//! Streams one timestamped random sample per second to every subscriber.
//!
//! Usage:
//!   pulsed [OPTIONS] [config.toml]
//!
//! Without a config file the server listens on 0.0.0.0:3000 and streams on
//! /api/sse.

mod config;

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pulse_api::{create_router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{DaemonConfig, LogFormat};

const DEFAULT_LOG_FILTER: &str = "pulsed=info,pulse_api=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "pulsed")]
#[command(author, version, about = "Pulse server daemon")]
struct Args {
    /// Server config file (TOML)
    #[arg(env = "PULSE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "PULSE_BIND")]
    bind: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long, env = "PULSE_PORT")]
    port: Option<u16>,

    /// Path of the stream endpoint
    #[arg(long, env = "PULSE_STREAM_PATH")]
    path: Option<String>,

    /// Interval between samples in milliseconds
    #[arg(long, env = "PULSE_TICK_MS")]
    tick_ms: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, env = "PULSE_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

impl Args {
    /// Command-line flags win over the config file
    fn apply(&self, config: &mut DaemonConfig) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(path) = &self.path {
            config.stream.path = path.clone();
        }
        if let Some(tick_ms) = self.tick_ms {
            config.stream.tick_interval_ms = tick_ms;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DaemonConfig::load(path)?,
        None => DaemonConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_logging(config.logging.format);

    tracing::info!("Starting pulsed (Pulse Server Daemon)");
    match &args.config {
        Some(path) => tracing::info!("Loaded config from: {}", path.display()),
        None => tracing::info!("No config file provided, using defaults"),
    }

    let producer = config.producer_config();
    tracing::info!(
        path = %producer.path,
        tick_interval_ms = producer.tick_interval.as_millis() as u64,
        "Stream endpoint configured"
    );

    let state = AppState::new(producer);
    let shutdown = state.shutdown_token();
    let app = create_router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Ends every open stream so in-flight connections can finish.
            shutdown.cancel();
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from(["pulsed", "--port", "4000", "--tick-ms", "250"]);
        let mut config = DaemonConfig::from_toml("[server]\nport = 9000\n").unwrap();
        args.apply(&mut config);

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.stream.tick_interval_ms, 250);
        assert_eq!(config.stream.path, "/api/sse");
    }

    #[test]
    fn test_positional_config_path() {
        let args = Args::parse_from(["pulsed", "--log-format", "json", "pulsed.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("pulsed.toml")));
        assert_eq!(args.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
