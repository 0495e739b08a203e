mod chat;
mod config;
mod dispatch;
mod error;
mod format;
mod record;
mod sender;
mod supervisor;

use anyhow::{Context, Result};
use chat::ChatEvent;
use clap::Parser;
use error::BridgeError;
use log::info;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

#[tokio::main]
async fn main() -> Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()?;

    let cli = config::Cli::parse();

    info!("reading config file {:?}", cli.config);
    let config = Arc::new(config::load_config(&cli)?);

    info!(
        "connecting {}!{}@* to {}",
        config.bot.nick, config.bot.user, config.irc.host
    );
    let (client, mut events) = chat::connect(&config).await?;

    // Delivery queue: every producer feeds it, only the paced sender drains it.
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();

    let mut tasks: JoinSet<Result<()>> = JoinSet::new();
    tasks.spawn(sender::run(client.clone(), Arc::clone(&config), queue_rx));

    let mut tailing = false;

    // Single exit point: any pipeline task error, a failed outbound line, or
    // the event stream closing terminates the whole service. There is no
    // retry and no graceful shutdown.
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ChatEvent::Connected) => {
                    for raw in &config.bot.on_connect {
                        info!("sending raw line '{raw}'");
                        client.send_raw(raw)?;
                    }

                    info!("joining {}", config.irc.channel);
                    client.join(&config.irc.channel)?;

                    if !tailing {
                        tailing = true;
                        tasks.spawn(supervisor::tail_journal(queue_tx.clone()));
                    }
                }
                Some(ChatEvent::Message { text, .. }) if dispatch::is_trigger(&text) => {
                    dispatch::run_diagnostics(&mut tasks, queue_tx.clone());
                }
                Some(_) => {}
                None => return Err(BridgeError::ConnectionClosed.into()),
            },
            Some(joined) = tasks.join_next() => {
                joined.context("pipeline task panicked")??;
            }
        }
    }
}
