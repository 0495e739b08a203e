use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "journal-bridge", version, about)]
pub struct Cli {
    /// Path to configuration file
    #[clap(long, default_value = "./journal-bridge.toml")]
    pub config: PathBuf,

    /// Override IRC server address (host:port)
    #[clap(long)]
    pub host: Option<String>,

    /// Override channel to ship logs to
    #[clap(long)]
    pub channel: Option<String>,

    /// Override bot nick
    #[clap(long)]
    pub nick: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub irc: IrcConfig,
    pub bot: BotConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    /// Server address to connect to (host:port)
    pub host: String,
    /// Server password, empty means none
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub use_tls: bool,
    /// Channel to output logs to
    pub channel: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub nick: String,
    /// Ident; defaults to the nick when omitted
    #[serde(default)]
    pub user: String,
    /// Raw lines to send right after registration
    #[serde(default)]
    pub on_connect: Vec<String>,
    /// Milliseconds to wait between messages
    pub send_delay_ms: u64,
}

pub fn load_config(cli: &Cli) -> Result<Config> {
    let config_content = fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config file: {:?}", cli.config))?;

    let mut config: Config =
        toml::from_str(&config_content).context("Failed to parse config file")?;

    // Apply CLI overrides
    if let Some(ref host) = cli.host {
        config.irc.host = host.clone();
    }

    if let Some(ref channel) = cli.channel {
        config.irc.channel = channel.clone();
    }

    if let Some(ref nick) = cli.nick {
        config.bot.nick = nick.clone();
    }

    if config.bot.user.is_empty() {
        config.bot.user = config.bot.nick.clone();
    }

    Ok(config)
}
