use crate::error::BridgeError;
use std::collections::HashMap;

/// How a raw line from a subprocess is turned into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Parse the line as a flat string-to-string JSON object (journalctl -o json).
    Structured,
    /// Wrap the line verbatim; used for diagnostic subprocess output.
    Raw,
}

/// A single normalized journal record. Constructed once per input line,
/// immutable afterwards. All fields are absent-tolerant; defaulting happens
/// in the formatter, not here.
#[derive(Debug, Clone, Default)]
pub struct LogRecord {
    pub unit: Option<String>,
    pub comm: Option<String>,
    pub syslog_identifier: Option<String>,
    pub transport: Option<String>,
    pub pid: Option<String>,
    pub priority: Option<String>,
    pub message: Option<String>,
    /// The original line, kept for diagnostics.
    pub raw: String,
}

pub fn decode(line: &str, mode: DecodeMode) -> Result<LogRecord, BridgeError> {
    match mode {
        DecodeMode::Raw => Ok(LogRecord {
            message: Some(line.to_string()),
            raw: line.to_string(),
            ..Default::default()
        }),
        DecodeMode::Structured => {
            // journalctl guarantees one well-formed object per line; a parse
            // failure means the stream is desynchronized and cannot be
            // trusted, so it propagates as a fatal error.
            let mut fields: HashMap<String, String> =
                serde_json::from_str(line).map_err(|source| BridgeError::Decode {
                    line: line.to_string(),
                    source,
                })?;

            Ok(LogRecord {
                unit: fields.remove("_SYSTEMD_UNIT"),
                comm: fields.remove("_COMM"),
                syslog_identifier: fields.remove("SYSLOG_IDENTIFIER"),
                transport: fields.remove("_TRANSPORT"),
                pid: fields.remove("_PID"),
                priority: fields.remove("PRIORITY"),
                message: fields.remove("MESSAGE"),
                raw: line.to_string(),
            })
        }
    }
}
