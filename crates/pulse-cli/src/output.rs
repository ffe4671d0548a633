//! Output formatting for pulse-cli (table, json)

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use pulse_client::{ConnectionStatus, ConsumerView, Sample};
use serde::{Deserialize, Serialize};
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Table,
    /// JSON, one document per line
    Json,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print an info message (unless in quiet mode or emitting JSON)
    pub fn info(&self, msg: &str) {
        if !self.quiet && self.format == OutputFormat::Table {
            println!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print one consumer snapshot
    pub fn print_view(&self, view: &ConsumerView) {
        match self.format {
            OutputFormat::Table => println!("{}", view_line(view)),
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string(view).unwrap_or_else(|_| "{}".to_string())
            ),
        }
    }

    /// Print a batch of samples
    pub fn print_samples(&self, samples: &[Sample]) {
        match self.format {
            OutputFormat::Table => {
                if samples.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    let rows: Vec<SampleRow> = samples.iter().map(SampleRow::from).collect();
                    println!("{}", Table::new(rows));
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(samples).unwrap_or_else(|_| "[]".to_string())
                );
            }
        }
    }
}

/// Single-line rendering of a consumer snapshot
pub fn view_line(view: &ConsumerView) -> String {
    let status = status_badge(view);
    let headline = match &view.error {
        Some(error) if view.status == ConnectionStatus::Errored => error.yellow(),
        Some(error) => error.red(),
        None => view.display_value().bold(),
    };
    let time = view
        .latest
        .as_ref()
        .map(|s| s.timestamp_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "[{}] {:<12} {}  [{}]",
        time,
        status,
        headline,
        view.toggle_label().dimmed()
    )
}

fn status_badge(view: &ConsumerView) -> ColoredString {
    let label = view.status_label();
    match view.status {
        ConnectionStatus::Connected => label.green(),
        ConnectionStatus::Connecting | ConnectionStatus::Errored => label.yellow(),
        ConnectionStatus::Disabled => label.dimmed(),
    }
}

// =============================================================================
// Display types
// =============================================================================

/// Sample display for the sample command
#[derive(Debug, Tabled, Serialize)]
pub struct SampleRow {
    #[tabled(rename = "Time")]
    pub timestamp: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
}

impl From<&Sample> for SampleRow {
    fn from(sample: &Sample) -> Self {
        Self {
            timestamp: sample.timestamp_string(),
            value: format!("{:.2}", sample.value),
            kind: sample.kind.to_string(),
        }
    }
}
