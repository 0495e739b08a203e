use crate::chat::ChatClient;
use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

/// Drain the delivery queue one line at a time, sleeping the configured
/// delay before every send (including the first). This is the only throttle
/// in the system; it exists to respect the server's flood limits, so a burst
/// of N lines takes at least N times the delay to drain.
///
/// A failed send means the connection is gone and propagates as fatal.
pub async fn run(
    client: ChatClient,
    config: Arc<Config>,
    mut queue: mpsc::UnboundedReceiver<String>,
) -> Result<()> {
    let delay = Duration::from_millis(config.bot.send_delay_ms);

    while let Some(line) = queue.recv().await {
        sleep(delay).await;
        client.send(&config.irc.channel, &line)?;
    }

    Ok(())
}
