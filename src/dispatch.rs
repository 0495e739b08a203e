use crate::record::DecodeMode;
use crate::supervisor;
use anyhow::Result;
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Literal, case-sensitive trigger. Anyone in the channel can use it; there
/// is deliberately no argument parsing, rate limiting, or sender check.
const TRIGGER: &str = "!sys-stats";

const DIAGNOSTICS: &[(&str, &[&str])] = &[
    ("/usr/bin/uptime", &[]),
    ("/usr/bin/free", &["-m"]),
];

pub fn is_trigger(text: &str) -> bool {
    text.starts_with(TRIGGER)
}

/// Run the diagnostic subprocesses, feeding their stdout into the delivery
/// queue as raw pass-through lines. One invocation is one task running the
/// commands sequentially, so its own output order is preserved; overlapping
/// invocations are allowed to run concurrently and interleave.
pub fn run_diagnostics(tasks: &mut JoinSet<Result<()>>, queue: mpsc::UnboundedSender<String>) {
    info!("diagnostics triggered");
    tasks.spawn(async move {
        for (command, args) in DIAGNOSTICS {
            supervisor::pump(command, args, DecodeMode::Raw, queue.clone()).await?;
        }
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_trigger_and_prefixed_text() {
        assert!(is_trigger("!sys-stats"));
        assert!(is_trigger("!sys-stats please"));
    }

    #[test]
    fn is_case_sensitive_and_prefix_anchored() {
        assert!(!is_trigger("!SYS-STATS"));
        assert!(!is_trigger("please !sys-stats"));
        assert!(!is_trigger("!sys"));
        assert!(!is_trigger(""));
    }
}
