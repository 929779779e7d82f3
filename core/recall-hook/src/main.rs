//! recall-hook: CLI hook handler for Recall session lifecycle tracking.
//!
//! Rust binary behind the hook registrations in ~/.claude/settings.json.
//! Runtime subcommands never exit non-zero; a broken memory layer must not
//! break the host session. Admin subcommands report failures normally.
//!
//! ## Subcommands
//!
//! - `session-start`: Start or resume a tracked session (SessionStart hook)
//! - `session-end`: End the active session with a summary (Stop hook)
//! - `tool-use`: Record agent spawns and file changes (PostToolUse hook)
//! - `install` / `uninstall`: Manage the hook registrations
//! - `status`: Report backend, registration and session state

mod admin;
mod logging;
mod session_end;
mod session_start;
mod tool_use;

use clap::{Parser, Subcommand};
use recall_core::StorageConfig;

#[derive(Parser)]
#[command(name = "recall-hook")]
#[command(about = "Recall session lifecycle tracker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start or resume a tracked session (SessionStart hook)
    SessionStart,

    /// End the active session and record its summary (Stop hook)
    SessionEnd,

    /// Record a tool invocation (PostToolUse hook, reads JSON from stdin)
    ToolUse,

    /// Register the hooks in Claude Code's settings
    Install,

    /// Remove the hooks from Claude Code's settings
    Uninstall,

    /// Report backend, hook registration and session state
    Status,
}

fn main() {
    let storage = StorageConfig::default();
    let _logging_guard = logging::init(&storage.log_dir());
    let cli = Cli::parse();

    match cli.command {
        // Hook-invoked commands log failures and still exit 0
        Commands::SessionStart => {
            if let Err(e) = session_start::run(&storage) {
                tracing::error!(error = %e, "session-start failed");
            }
        }
        Commands::SessionEnd => {
            if let Err(e) = session_end::run(&storage) {
                tracing::error!(error = %e, "session-end failed");
            }
        }
        Commands::ToolUse => {
            if let Err(e) = tool_use::run(&storage) {
                tracing::error!(error = %e, "tool-use failed");
            }
        }
        Commands::Install => {
            if let Err(e) = admin::install(&storage) {
                eprintln!("Install failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Uninstall => {
            if let Err(e) = admin::uninstall(&storage) {
                eprintln!("Uninstall failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Status => {
            if let Err(e) = admin::status(&storage) {
                eprintln!("Status failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}
