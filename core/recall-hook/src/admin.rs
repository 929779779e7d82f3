//! Install, uninstall and status subcommands.
//!
//! These run from a terminal, not from a hook, so they print human-readable
//! text and are allowed to fail with a non-zero exit.

use chrono::Utc;
use fs_err as fs;
use recall_core::{
    format_time_ago, locate_backend, ConfigSynchronizer, RecallError, Result, SessionPointer,
    StorageConfig,
};

pub fn install(storage: &StorageConfig) -> Result<()> {
    storage.ensure_dirs().map_err(|e| RecallError::Io {
        context: "creating recall home".to_string(),
        source: e,
    })?;

    let exe = std::env::current_exe().map_err(|e| RecallError::Io {
        context: "resolving hook executable path".to_string(),
        source: e,
    })?;

    ConfigSynchronizer::new(storage.clone()).install(&exe)?;

    println!(
        "Recall hooks installed in {}",
        storage.claude_settings_file().display()
    );
    println!("Restart Claude Code sessions to pick them up.");
    Ok(())
}

pub fn uninstall(storage: &StorageConfig) -> Result<()> {
    ConfigSynchronizer::new(storage.clone()).uninstall()?;

    println!(
        "Recall hooks removed from {}",
        storage.claude_settings_file().display()
    );
    println!(
        "Session memory in {} was left in place.",
        storage.store_file().display()
    );
    Ok(())
}

pub fn status(storage: &StorageConfig) -> Result<()> {
    println!("Recall status");

    let backend = locate_backend(storage);
    match &backend {
        Some(store) => println!("  Backend: {}", store.describe()),
        None => println!("  Backend: not found"),
    }

    let store_file = storage.store_file();
    match fs::metadata(&store_file) {
        Ok(meta) => println!(
            "  Store: {} ({} KB)",
            store_file.display(),
            meta.len() / 1024
        ),
        Err(_) => println!("  Store: not created yet"),
    }

    println!("  Hooks:");
    let registrations = ConfigSynchronizer::new(storage.clone()).registration_state();
    let all_installed = registrations.iter().all(|s| s.installed);
    for state in &registrations {
        let mark = if state.installed { "installed" } else { "missing" };
        println!("    {}: {}", state.event, mark);
    }

    match SessionPointer::new(storage).load() {
        Some(handle) => println!(
            "  Session: {} in {} (started {})",
            handle.session_id,
            handle.project,
            format_time_ago(Some(handle.started_at), Utc::now().timestamp_millis())
        ),
        None => println!("  Session: none"),
    }

    if backend.is_none() {
        println!("Not ready: no backend found. Install the recall binary or plugin.");
    } else if !all_installed {
        println!("Not ready: hooks missing. Run: recall-hook install");
    } else {
        println!("Ready.");
    }

    Ok(())
}
