//! File logging for hook invocations.
//!
//! Hooks own stdout (Claude Code shows it to the user), so diagnostics go
//! to a daily-rolled file under the recall log directory instead. The
//! `RECALL_LOG` environment variable takes the usual filter syntax and
//! defaults to `warn`.

use fs_err as fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "RECALL_LOG";

/// Initializes file logging, returning the guard that flushes buffered
/// lines at exit. Hold it for the life of main.
///
/// Returns `None` when the log directory cannot be created or a subscriber
/// is already installed; the hook still runs, just silently.
pub fn init(log_dir: &Path) -> Option<WorkerGuard> {
    if fs::create_dir_all(log_dir).is_err() {
        return None;
    }

    let appender = tracing_appender::rolling::daily(log_dir, "recall-hook.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()
        .map(|_| guard)
}
