//! The active-session pointer file.
//!
//! `~/.recall/active-session.json` records the one session this machine
//! currently considers active. It is read-then-written without locking;
//! the host fires hooks serially, so racing writers are out of scope.
//!
//! The pointer is deleted only after the backend confirms the session
//! ended. A failed end call leaves it in place so the session is retried
//! rather than silently dropped.

use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{RecallError, Result};
use crate::storage::StorageConfig;

/// How long a pointer may stand in for a new session in the same project.
pub const REUSE_WINDOW_MS: i64 = 60 * 60 * 1000;

/// Identity and metadata of the currently active session.
///
/// Loaded from the pointer once per hook invocation and threaded through
/// explicitly; nothing reads the file ambiently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: String,
    pub project: String,
    pub cwd: String,
    /// Wall-clock start, milliseconds since the epoch.
    pub started_at: i64,
}

impl SessionHandle {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.started_at
    }

    /// Whether this handle can be resumed for a new start in `project`.
    pub fn is_reusable(&self, project: &str, now_ms: i64) -> bool {
        self.project == project && self.age_ms(now_ms) < REUSE_WINDOW_MS
    }
}

/// Read/write access to the pointer file.
#[derive(Debug, Clone)]
pub struct SessionPointer {
    path: PathBuf,
}

impl SessionPointer {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            path: storage.pointer_file(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the current handle.
    ///
    /// An absent or unreadable pointer means "no active session"; corruption
    /// is logged and treated as absence rather than propagated.
    pub fn load(&self) -> Option<SessionHandle> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return None,
        };

        match serde_json::from_str(&content) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(
                    error = %err,
                    path = %self.path.display(),
                    "Ignoring unreadable session pointer"
                );
                None
            }
        }
    }

    /// Atomically writes the handle (temp file + rename in the same dir).
    pub fn save(&self, handle: &SessionHandle) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| RecallError::NoParentDir(self.path.clone()))?;
        fs::create_dir_all(parent).map_err(|e| RecallError::Io {
            context: "creating recall home".to_string(),
            source: e,
        })?;

        let content = serde_json::to_string_pretty(handle).map_err(|e| RecallError::Json {
            context: "serializing session pointer".to_string(),
            source: e,
        })?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| RecallError::Io {
            context: "creating temp pointer file".to_string(),
            source: e,
        })?;
        temp.write_all(content.as_bytes())
            .map_err(|e| RecallError::Io {
                context: "writing temp pointer file".to_string(),
                source: e,
            })?;
        temp.flush().map_err(|e| RecallError::Io {
            context: "flushing temp pointer file".to_string(),
            source: e,
        })?;
        temp.persist(&self.path).map_err(|e| RecallError::Io {
            context: "persisting session pointer".to_string(),
            source: e.error,
        })?;

        Ok(())
    }

    /// Removes the pointer. A pointer that is already gone is fine (a second
    /// end attempt must stay a no-op).
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RecallError::Io {
                context: "removing session pointer".to_string(),
                source: e,
            }),
        }
    }
}
