use crate::error::BridgeError;
use crate::format;
use crate::record::{self, DecodeMode};
use anyhow::{Context, Result};
use log::info;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;

const JOURNAL_COMMAND: &str = "/usr/bin/journalctl";
const JOURNAL_ARGS: &[&str] = &["-f", "-o", "json"];

/// Line-delimited view over a child's stdout (or any async byte source).
/// No buffering beyond line delimiting.
pub struct LineReader<R> {
    inner: BufReader<R>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            inner: BufReader::new(source),
        }
    }

    /// Next complete line, with the CR/LF delimiter stripped. Returns
    /// `Ok(None)` at end of stream. A trailing line with no delimiter is
    /// discarded rather than emitted, since it cannot be decoded reliably.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let mut buf = Vec::new();
        let n = self.inner.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        if buf.last() != Some(&b'\n') {
            // Partial final line at process exit
            return Ok(None);
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}

/// Launch a child process and expose its stdout as a line stream. The caller
/// keeps the `Child` alive for as long as the stream is being read.
pub fn spawn_lines(
    command: &str,
    args: &[&str],
) -> Result<(Child, LineReader<ChildStdout>), BridgeError> {
    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| BridgeError::Subprocess(format!("no stdout handle for {command}")))?;

    Ok((child, LineReader::new(stdout)))
}

/// Run one subprocess to completion, feeding each of its output lines through
/// decode and format into the delivery queue. Any spawn, read, or decode
/// failure propagates to the caller.
pub async fn pump(
    command: &str,
    args: &[&str],
    mode: DecodeMode,
    queue: mpsc::UnboundedSender<String>,
) -> Result<()> {
    info!("spawning {} {}", command, args.join(" "));
    let (mut child, lines) =
        spawn_lines(command, args).with_context(|| format!("failed to start {command}"))?;

    pump_lines(lines, mode, &queue).await?;

    // Reap the child; the stream closing means it has exited.
    let _ = child.wait().await;
    Ok(())
}

/// The decode → format → enqueue loop, separated from process spawning so it
/// can be driven by any line source.
pub async fn pump_lines<R: AsyncRead + Unpin>(
    mut lines: LineReader<R>,
    mode: DecodeMode,
    queue: &mpsc::UnboundedSender<String>,
) -> Result<()> {
    while let Some(line) = lines.next_line().await? {
        let record = record::decode(&line, mode)?;
        let display = format::format_record(&record);
        queue.send(display).map_err(|_| BridgeError::QueueClosed)?;
    }
    Ok(())
}

/// Tail the journal forever. The journal tail must not terminate under
/// normal operation, so end-of-stream is an error like any other.
pub async fn tail_journal(queue: mpsc::UnboundedSender<String>) -> Result<()> {
    pump(JOURNAL_COMMAND, JOURNAL_ARGS, DecodeMode::Structured, queue).await?;
    anyhow::bail!("log source exited unexpectedly")
}
