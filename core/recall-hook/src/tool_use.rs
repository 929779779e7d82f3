//! PostToolUse hook: record agent spawns and file changes.
//!
//! Reads the tool event JSON from stdin and forwards the classified step to
//! the active session, if there is one. Prints nothing; this hook fires on
//! every matched tool call and must stay invisible.

use std::io::{self, Read};

use recall_core::{locate_backend, RecallError, Result, StorageConfig, ToolEventRecorder};
use tracing::debug;

pub fn run(storage: &StorageConfig) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| RecallError::Io {
            context: "reading hook payload".to_string(),
            source: e,
        })?;
    if input.trim().is_empty() {
        return Ok(());
    }

    let Some(store) = locate_backend(storage) else {
        debug!("No backend located, dropping tool event");
        return Ok(());
    };

    let recorder = ToolEventRecorder::new(storage.clone());
    if let Some(action) = recorder.record(store.as_ref(), &input) {
        debug!(?action, "Recorded step");
    }

    Ok(())
}
