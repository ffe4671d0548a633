//! Sample command - print a fixed number of samples and exit

use std::time::Duration;

use anyhow::{bail, Context, Result};
use pulse_client::PulseClient;

use crate::output::OutputContext;

/// Subscribe once, collect `count` samples, then close the subscription
///
/// Unlike `watch` this does not reconnect: any stream error ends the command.
pub async fn sample(
    client: &PulseClient,
    count: usize,
    timeout: Duration,
    ctx: &OutputContext,
) -> Result<()> {
    ctx.info(&format!(
        "Collecting {} sample(s) from {}...",
        count,
        client.stream_url()
    ));

    let mut subscription = client
        .subscribe()
        .await
        .with_context(|| format!("Failed to subscribe to {}", client.stream_url()))?;

    let mut samples = Vec::with_capacity(count);
    let mut malformed = 0usize;

    while samples.len() < count {
        let event = tokio::time::timeout(timeout, subscription.next())
            .await
            .with_context(|| format!("No sample within {:?}", timeout))?;

        match event {
            Some(Ok(sample)) => {
                tracing::debug!(value = sample.value, "Sample received");
                samples.push(sample);
            }
            Some(Err(e)) if e.is_parse() => {
                malformed += 1;
                ctx.warn(&format!("Skipping malformed event: {}", e));
            }
            Some(Err(e)) => return Err(e).context("Stream failed"),
            None => bail!("Stream ended after {} sample(s)", samples.len()),
        }
    }
    drop(subscription);

    ctx.print_samples(&samples);
    if malformed > 0 {
        ctx.warn(&format!("{} malformed event(s) skipped", malformed));
    }

    Ok(())
}
