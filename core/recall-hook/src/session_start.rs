//! SessionStart hook: start or resume a tracked session.
//!
//! The project is named after the working directory, matching how the
//! backend scopes its recall query. Output goes to stdout where the host
//! surfaces it at the top of the session.

use recall_core::{
    locate_backend, RecallError, Result, SessionLifecycleManager, StartOutcome, StorageConfig,
};

pub fn run(storage: &StorageConfig) -> Result<()> {
    let cwd = std::env::current_dir().map_err(|e| RecallError::Io {
        context: "resolving working directory".to_string(),
        source: e,
    })?;
    let project = cwd
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let Some(store) = locate_backend(storage) else {
        println!("Recall: Memory unavailable - session not tracked");
        return Ok(());
    };

    let manager = SessionLifecycleManager::new(storage.clone(), store.as_ref());
    match manager.start(&project, &cwd.to_string_lossy())? {
        StartOutcome::Resumed(handle) => {
            println!("Recall: Resuming session {}", handle.session_id);
        }
        StartOutcome::Started {
            handle,
            prior_context,
        } => {
            println!("Recall: Memory session started - {}", handle.session_id);
            if let Some(context) = prior_context {
                println!("{}", context);
            }
        }
        StartOutcome::Unavailable => {
            println!("Recall: Memory unavailable - session not tracked");
        }
    }

    Ok(())
}
