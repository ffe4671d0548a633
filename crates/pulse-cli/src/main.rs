//! Pulse CLI - terminal viewer for pulse sample streams
//!
//! `watch` keeps a reconnecting live view of the stream; `sample` prints a
//! fixed number of samples and exits.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pulse_client::{ConsumerConfig, PulseClient};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{ArgOverrides, Config};
use crate::output::{OutputContext, OutputFormat};

/// Connection timeout for each subscription attempt
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "pulse-cli")]
#[command(author, version, about = "Pulse stream viewer")]
#[command(propagate_version = true)]
struct Cli {
    /// Server URL [default: http://localhost:3000]
    #[arg(short, long, env = "PULSE_SERVER")]
    server: Option<String>,

    /// Stream endpoint path [default: /api/sse]
    #[arg(long, env = "PULSE_STREAM_PATH")]
    path: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "PULSE_CLI_CONFIG")]
    config: Option<PathBuf>,

    /// Output format [default: table]
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the live value, reconnecting after connection loss
    Watch {
        /// Wait before reconnecting, in milliseconds [default: 5000]
        #[arg(long)]
        reconnect_delay_ms: Option<u64>,
    },

    /// Print a number of samples and exit
    Sample {
        /// Number of samples to collect
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,

        /// Give up if no sample arrives within this many seconds
        #[arg(long, default_value = "10")]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("pulse_cli=debug,pulse_client=debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    let reconnect_delay_ms = match &cli.command {
        Commands::Watch { reconnect_delay_ms } => *reconnect_delay_ms,
        Commands::Sample { .. } => None,
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(&ArgOverrides {
        server: cli.server.as_deref(),
        path: cli.path.as_deref(),
        output: cli.output,
        no_color: cli.no_color,
        reconnect_delay_ms,
    });

    let ctx = OutputContext::new(merged.output, merged.no_color, cli.quiet);
    let client = PulseClient::with_config(&merged.server, &merged.path, CONNECT_TIMEOUT)
        .with_context(|| format!("Invalid server URL: {}", merged.server))?;

    // Execute command
    match &cli.command {
        Commands::Watch { .. } => {
            let consumer_config =
                ConsumerConfig::default().with_reconnect_delay(merged.reconnect_delay);
            commands::watch(client, consumer_config, &ctx).await?;
        }

        Commands::Sample {
            count,
            timeout_secs,
        } => {
            commands::sample(&client, *count, Duration::from_secs(*timeout_secs), &ctx).await?;
        }
    }

    Ok(())
}
