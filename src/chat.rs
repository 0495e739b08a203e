use crate::config::Config;
use crate::error::BridgeError;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

/// Inbound events the rest of the bridge reacts to. Everything else the
/// server sends is handled here (PING) or ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Registration completed (numeric 001).
    Connected,
    /// A PRIVMSG arrived in a channel.
    Message { channel: String, text: String },
}

/// Handle for outbound traffic. Sends are non-blocking pushes into the
/// writer task's queue; pacing lives entirely in the paced sender.
#[derive(Clone)]
pub struct ChatClient {
    raw_tx: mpsc::UnboundedSender<String>,
}

impl ChatClient {
    pub fn send_raw(&self, line: &str) -> Result<(), BridgeError> {
        self.raw_tx
            .send(line.to_string())
            .map_err(|_| BridgeError::ConnectionClosed)
    }

    pub fn join(&self, channel: &str) -> Result<(), BridgeError> {
        self.send_raw(&format!("JOIN {channel}"))
    }

    pub fn send(&self, channel: &str, text: &str) -> Result<(), BridgeError> {
        self.send_raw(&format!("PRIVMSG {channel} :{text}"))
    }

    #[cfg(test)]
    pub(crate) fn test_pair() -> (ChatClient, mpsc::UnboundedReceiver<String>) {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        (ChatClient { raw_tx }, raw_rx)
    }
}

/// Connect to the IRC server, start the I/O task, and register. The returned
/// event receiver closing means the connection is gone; there is no
/// reconnection.
pub async fn connect(config: &Config) -> Result<(ChatClient, mpsc::UnboundedReceiver<ChatEvent>)> {
    let tcp = TcpStream::connect(&config.irc.host)
        .await
        .with_context(|| format!("failed to connect to {}", config.irc.host))?;

    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let client = ChatClient { raw_tx };

    if config.irc.use_tls {
        let stream = tls_handshake(tcp, &config.irc.host).await?;
        tokio::spawn(run_io(stream, raw_rx, event_tx));
    } else {
        tokio::spawn(run_io(tcp, raw_rx, event_tx));
    }

    if !config.irc.password.is_empty() {
        client.send_raw(&format!("PASS {}", config.irc.password))?;
    }
    client.send_raw(&format!("NICK {}", config.bot.nick))?;
    client.send_raw(&format!("USER {} 0 * :{}", config.bot.user, config.bot.user))?;

    Ok((client, event_rx))
}

async fn tls_handshake(
    tcp: TcpStream,
    host: &str,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let tls_config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(tls_config));

    let server_name = ServerName::try_from(tls_server_name(host).to_string())
        .context("invalid TLS server name")?;

    connector
        .connect(server_name, tcp)
        .await
        .context("TLS handshake failed")
}

/// Strip the port from a `host:port` address, handling bracketed IPv6
/// literals (`[::1]:6697` -> `::1`).
fn tls_server_name(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        if let Some((name, _)) = rest.split_once(']') {
            return name;
        }
    }
    host.rsplit_once(':').map(|(name, _)| name).unwrap_or(host)
}

/// Reader/writer loop over one established connection. Exits on socket close
/// or error; dropping `event_tx` is how the rest of the bridge learns the
/// connection died.
async fn run_io<S>(
    stream: S,
    mut raw_rx: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::UnboundedSender<ChatEvent>,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut lines = BufReader::new(read_half).lines();

    loop {
        tokio::select! {
            inbound = lines.next_line() => match inbound {
                Ok(Some(line)) => {
                    debug!("<- {line}");
                    if handle_line(&line, &mut write_half, &event_tx).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("chat read error: {e}");
                    break;
                }
            },
            outbound = raw_rx.recv() => match outbound {
                Some(line) => {
                    debug!("-> {line}");
                    if write_line(&mut write_half, &line).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

async fn handle_line<S: AsyncWrite>(
    line: &str,
    write_half: &mut WriteHalf<S>,
    event_tx: &mpsc::UnboundedSender<ChatEvent>,
) -> std::io::Result<()> {
    let msg = Message::parse(line);
    match msg.command.as_str() {
        // Keepalive, answered immediately and never paced
        "PING" => {
            let token = msg.trailing.unwrap_or_default();
            write_line(write_half, &format!("PONG :{token}")).await?;
        }
        "001" => {
            let _ = event_tx.send(ChatEvent::Connected);
        }
        "PRIVMSG" => {
            if let (Some(target), Some(text)) = (msg.params.first(), msg.trailing) {
                let _ = event_tx.send(ChatEvent::Message {
                    channel: target.clone(),
                    text,
                });
            }
        }
        _ => {}
    }
    Ok(())
}

async fn write_line<S: AsyncWrite>(write_half: &mut WriteHalf<S>, line: &str) -> std::io::Result<()> {
    write_half.write_all(format!("{line}\r\n").as_bytes()).await
}

/// One parsed server line: `[:prefix] COMMAND params [:trailing]`. The
/// prefix (sender) is dropped; nothing in the bridge authorizes senders.
#[derive(Debug, PartialEq, Eq)]
struct Message {
    command: String,
    params: Vec<String>,
    trailing: Option<String>,
}

impl Message {
    fn parse(line: &str) -> Message {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        if let Some(after) = rest.strip_prefix(':') {
            rest = after.split_once(' ').map(|(_, r)| r).unwrap_or("");
        }

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing.to_string())),
            None => (rest, None),
        };

        let mut parts = head.split_whitespace().map(str::to_string);
        Message {
            command: parts.next().unwrap_or_default(),
            params: parts.collect(),
            trailing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn derives_tls_server_name_from_address() {
        assert_eq!(tls_server_name("irc.example.net:6697"), "irc.example.net");
        assert_eq!(tls_server_name("irc.example.net"), "irc.example.net");
        assert_eq!(tls_server_name("127.0.0.1:6697"), "127.0.0.1");
        assert_eq!(tls_server_name("[::1]:6697"), "::1");
        assert_eq!(tls_server_name("[2001:db8::1]:6697"), "2001:db8::1");
    }

    #[test]
    fn parses_privmsg() {
        let msg = Message::parse(":nick!user@host PRIVMSG #syslog :!sys-stats now\r\n");
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#syslog"]);
        assert_eq!(msg.trailing.as_deref(), Some("!sys-stats now"));
    }

    #[test]
    fn parses_ping_without_prefix() {
        let msg = Message::parse("PING :irc.example.net");
        assert_eq!(msg.command, "PING");
        assert!(msg.params.is_empty());
        assert_eq!(msg.trailing.as_deref(), Some("irc.example.net"));
    }

    #[test]
    fn parses_numeric_with_params() {
        let msg = Message::parse(":irc.example.net 001 tailbot :Welcome to the network");
        assert_eq!(msg.command, "001");
        assert_eq!(msg.params, vec!["tailbot"]);
        assert_eq!(msg.trailing.as_deref(), Some("Welcome to the network"));
    }

    #[tokio::test]
    async fn io_loop_answers_ping_and_emits_events() {
        let (client_side, server_side) = tokio::io::duplex(1024);
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (event_tx, mut events) = mpsc::unbounded_channel();
        tokio::spawn(run_io(client_side, raw_rx, event_tx));

        let (server_read, mut server_write) = tokio::io::split(server_side);
        let mut server_lines = BufReader::new(server_read).lines();

        server_write
            .write_all(b":irc.example.net 001 tailbot :Welcome\r\n")
            .await
            .unwrap();
        assert_eq!(events.recv().await, Some(ChatEvent::Connected));

        server_write.write_all(b"PING :token\r\n").await.unwrap();
        assert_eq!(
            server_lines.next_line().await.unwrap().as_deref(),
            Some("PONG :token")
        );

        server_write
            .write_all(b":nick!user@host PRIVMSG #syslog :hello\r\n")
            .await
            .unwrap();
        assert_eq!(
            events.recv().await,
            Some(ChatEvent::Message {
                channel: "#syslog".into(),
                text: "hello".into(),
            })
        );

        raw_tx.send("JOIN #syslog".into()).unwrap();
        assert_eq!(
            server_lines.next_line().await.unwrap().as_deref(),
            Some("JOIN #syslog")
        );
    }

    #[tokio::test]
    async fn event_stream_closes_when_server_hangs_up() {
        let (client_side, server_side) = tokio::io::duplex(1024);
        let (_raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (event_tx, mut events) = mpsc::unbounded_channel();
        tokio::spawn(run_io(client_side, raw_rx, event_tx));

        drop(server_side);
        assert_eq!(events.recv().await, None);
    }
}
