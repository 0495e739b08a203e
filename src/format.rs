use crate::record::LogRecord;

// mIRC control codes
const BOLD: &str = "\x02";
const RESET: &str = "\x0f";
const RED: &str = "\x0304";

const SCOPE_SUFFIX: &str = ".scope";
const SERVICE_SUFFIX: &str = ".service";

/// Priority assumed when a record carries none; many records lack PRIORITY.
const DEFAULT_PRIORITY: u8 = 6;

/// Render one record as a single display line:
/// the unit/pid segment is always bold, the message segment gets
/// priority-driven styling on top.
pub fn format_record(record: &LogRecord) -> String {
    let unit = resolve_unit(record);

    let priority = record
        .priority
        .as_deref()
        .and_then(|p| p.parse::<u8>().ok())
        .unwrap_or(DEFAULT_PRIORITY);

    let mut style = String::new();
    if priority <= 5 {
        // Notice or higher, use bold
        style.push_str(BOLD);
    }
    if priority <= 3 {
        // err and higher, use bold red
        style.push_str(RED);
    }

    let pid = record.pid.as_deref().unwrap_or("");
    let message = record.message.as_deref().unwrap_or("");

    format!("{BOLD}{unit}[{pid}]:{RESET}{style} {message}")
}

/// Pick a display name for the emitting unit. Scopes aren't useful to see,
/// so a `.scope` unit falls through to the executable name, then the syslog
/// identifier, then the transport (kernel log, audit log, ...).
fn resolve_unit(record: &LogRecord) -> String {
    let unit = record
        .unit
        .as_deref()
        .filter(|u| !u.ends_with(SCOPE_SUFFIX))
        .or(record.comm.as_deref())
        .or(record.syslog_identifier.as_deref())
        .or(record.transport.as_deref())
        .unwrap_or("");

    // Strip .service; almost everything is a service, the suffix is noise.
    unit.strip_suffix(SERVICE_SUFFIX).unwrap_or(unit).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{decode, DecodeMode};

    fn record_with_priority(priority: Option<&str>) -> LogRecord {
        LogRecord {
            unit: Some("app.service".into()),
            pid: Some("1".into()),
            priority: priority.map(str::to_string),
            message: Some("msg".into()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_priority_defaults_to_info_with_no_styling() {
        let line = format_record(&record_with_priority(None));
        assert_eq!(line, "\x02app[1]:\x0f msg");
    }

    #[test]
    fn unparsable_priority_defaults_to_info() {
        let line = format_record(&record_with_priority(Some("high")));
        assert_eq!(line, "\x02app[1]:\x0f msg");
    }

    #[test]
    fn warning_priority_is_bold_only() {
        for p in ["4", "5"] {
            let line = format_record(&record_with_priority(Some(p)));
            assert_eq!(line, "\x02app[1]:\x0f\x02 msg");
        }
    }

    #[test]
    fn error_priority_is_bold_and_red() {
        for p in ["0", "1", "2", "3"] {
            let line = format_record(&record_with_priority(Some(p)));
            assert_eq!(line, "\x02app[1]:\x0f\x02\x0304 msg");
        }
    }

    #[test]
    fn info_priority_has_no_message_styling() {
        for p in ["6", "7"] {
            let line = format_record(&record_with_priority(Some(p)));
            assert_eq!(line, "\x02app[1]:\x0f msg");
        }
    }

    #[test]
    fn scope_unit_falls_through_to_comm() {
        let record = LogRecord {
            unit: Some("session-4.scope".into()),
            comm: Some("bar".into()),
            ..Default::default()
        };
        assert_eq!(resolve_unit(&record), "bar");
    }

    #[test]
    fn service_suffix_is_stripped() {
        let record = LogRecord {
            unit: Some("nginx.service".into()),
            ..Default::default()
        };
        assert_eq!(resolve_unit(&record), "nginx");
    }

    #[test]
    fn comm_falls_through_to_syslog_identifier() {
        let record = LogRecord {
            syslog_identifier: Some("cron".into()),
            transport: Some("syslog".into()),
            ..Default::default()
        };
        assert_eq!(resolve_unit(&record), "cron");
    }

    #[test]
    fn transport_is_last_resort() {
        let record = LogRecord {
            transport: Some("kernel".into()),
            ..Default::default()
        };
        assert_eq!(resolve_unit(&record), "kernel");
    }

    #[test]
    fn empty_record_still_formats() {
        let line = format_record(&LogRecord::default());
        assert_eq!(line, "\x02[]:\x0f ");
    }

    #[test]
    fn decoded_sshd_record_renders_alert_styled() {
        let line = r#"{"PRIORITY":"2","_SYSTEMD_UNIT":"sshd.service","_PID":"123","MESSAGE":"auth failure"}"#;
        let record = decode(line, DecodeMode::Structured).unwrap();
        assert_eq!(
            format_record(&record),
            "\x02sshd[123]:\x0f\x02\x0304 auth failure"
        );
    }
}
