//! Watch command - live view of the stream with reconnects

use anyhow::Result;
use pulse_client::{Consumer, ConsumerConfig, PulseClient};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::output::OutputContext;

/// Keyboard commands read from stdin, one per line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Toggle,
    Quit,
    Ignore,
    Unknown,
}

impl Input {
    fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "t" | "toggle" => Input::Toggle,
            "q" | "quit" | "exit" => Input::Quit,
            "" => Input::Ignore,
            _ => Input::Unknown,
        }
    }
}

/// Run a consumer until Ctrl+C or `q`, printing every state change
pub async fn watch(client: PulseClient, config: ConsumerConfig, ctx: &OutputContext) -> Result<()> {
    ctx.info(&format!("Watching {}", client.stream_url()));
    ctx.info("Type 't' + Enter to start/stop the connection, 'q' + Enter or Ctrl+C to quit");

    let consumer = Consumer::spawn(client, config);
    let mut views = consumer.watch();
    ctx.print_view(&views.borrow_and_update());

    consumer.enable();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("Ctrl+C received");
                break;
            }
            changed = views.changed() => {
                if changed.is_err() {
                    ctx.error("Consumer stopped unexpectedly");
                    break;
                }
                let view = views.borrow_and_update().clone();
                ctx.print_view(&view);
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match Input::parse(&line) {
                        Input::Toggle => consumer.toggle(),
                        Input::Quit => break,
                        Input::Ignore => {}
                        Input::Unknown => ctx.warn(&format!("Unknown command: {}", line.trim())),
                    },
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read stdin");
                        stdin_open = false;
                    }
                }
            }
        }
    }

    ctx.info("Stopping...");
    consumer.shutdown().await;
    Ok(())
}
