//! Clients for the external memory backend.
//!
//! Two incompatible backend generations exist in the wild: a compiled
//! `recall` binary and the older `recall_memory.py` script. They disagree on
//! sub-command grammar and on response shapes, but persist to the same store
//! file. [`MemoryStore`] abstracts the grammar behind one trait;
//! [`locate_backend`] decides which generation answers.
//!
//! Every call is one blocking subprocess invocation with a deadline. Failure
//! splits into two cases callers treat differently: the backend could not be
//! run ([`StoreError::Unavailable`]) versus it ran and answered garbage
//! ([`StoreError::Malformed`]).

mod binary;
mod exec;
mod locate;
mod script;

pub use binary::BinaryStore;
pub use locate::locate_backend;
pub use script::ScriptStore;

use serde::Deserialize;
use serde_json::Value;

/// Environment variable naming the store file; honored by both generations.
pub const STORE_DB_ENV: &str = "RECALL_MEMORY_DB";

/// Step type tag for agent spawns.
pub const STEP_AGENT_SPAWN: &str = "agent_spawn";
/// Step type tag for file changes.
pub const STEP_FILE_MODIFY: &str = "file_modify";

/// Character budget for the end-of-session summary argument.
pub(crate) const SUMMARY_MAX_CHARS: usize = 500;
/// Character budget for action and file-path arguments.
pub(crate) const ACTION_MAX_CHARS: usize = 200;

/// How a backend call failed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend process could not be run to completion: spawn failure,
    /// non-zero exit, or deadline hit.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend ran but its answer could not be used.
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// Change tags forwarded on file tool events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    Write,
    Edit,
}

impl FileChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileChangeKind::Write => "Write",
            FileChangeKind::Edit => "Edit",
        }
    }
}

impl std::fmt::Display for FileChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prior-session context returned by the recall query.
///
/// Every field is optional; the generations disagree on which ones they
/// fill in, and older stores carry fewer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LastSession {
    pub feature_name: Option<String>,
    pub feature_status: Option<String>,
    pub current_stage: Option<u32>,
    pub stage_name: Option<String>,
    pub next_stage: Option<u32>,
    pub next_agent: Option<String>,
    pub next_stage_name: Option<String>,
    pub started_at: Option<i64>,
    #[serde(default)]
    pub last_actions: Vec<String>,
}

/// One recorded step, as listed by the backend. Only the type tag matters
/// for statistics; the rest of the record is passed over.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepRecord {
    #[serde(default)]
    pub step_type: Option<String>,
}

/// The operations the coordination layer needs from a backend, independent
/// of generation. Implementations translate each call into one subprocess
/// invocation.
pub trait MemoryStore {
    /// Creates the persisted store if it does not exist. Idempotent.
    fn init(&self) -> Result<(), StoreError>;

    /// Creates a new session scoped to `project`, returning its id.
    fn start_session(&self, project: &str) -> Result<String, StoreError>;

    /// Marks `session_id` ended with a composed summary. Success here is
    /// what licenses deleting the local pointer.
    fn end_session(&self, session_id: &str, summary: &str) -> Result<(), StoreError>;

    /// Most recent prior session context for `project`. `Ok(None)` is a
    /// normal answer for a fresh store.
    fn last_session(&self, project: &str) -> Result<Option<LastSession>, StoreError>;

    /// All steps recorded for the session.
    fn list_steps(&self, session_id: &str) -> Result<Vec<StepRecord>, StoreError>;

    /// Records an agent spawn. Fire-and-forget; output is ignored.
    fn record_agent_spawn(
        &self,
        session_id: &str,
        agent_name: &str,
        agent_model: &str,
        action: &str,
    ) -> Result<(), StoreError>;

    /// Records a file change. Fire-and-forget; output is ignored.
    fn record_file_change(
        &self,
        session_id: &str,
        change: FileChangeKind,
        file_path: &str,
    ) -> Result<(), StoreError>;

    /// Attaches a feature name/stage to the backend's feature record.
    fn attach_feature(&self, name: &str, project: &str, stage: u32) -> Result<(), StoreError>;

    /// Where this backend lives, for status output.
    fn describe(&self) -> String;
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared response parsing
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn parse_session_id(raw: &str) -> Result<String, StoreError> {
    #[derive(Deserialize)]
    struct StartResponse {
        session_id: String,
    }

    let resp: StartResponse = serde_json::from_str(raw)
        .map_err(|e| StoreError::Malformed(format!("session start response: {}", e)))?;
    Ok(resp.session_id)
}

/// Accepts both recall shapes: the binary wraps the payload in
/// `{"last_session": ...}`, the script prints it bare. JSON null either way
/// means "no prior session".
pub(crate) fn parse_last_session(raw: &str) -> Result<Option<LastSession>, StoreError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| StoreError::Malformed(format!("recall response: {}", e)))?;

    let inner = match value {
        Value::Object(mut map) if map.contains_key("last_session") => {
            map.remove("last_session").unwrap_or(Value::Null)
        }
        other => other,
    };

    if inner.is_null() {
        return Ok(None);
    }

    let info = serde_json::from_value(inner)
        .map_err(|e| StoreError::Malformed(format!("last_session payload: {}", e)))?;
    Ok(Some(info))
}

/// Accepts both step-list shapes: `{"steps": [...]}` from the binary, a bare
/// array from the script. Individual records that do not parse still count
/// toward the total, just without a type tag.
pub(crate) fn parse_steps(raw: &str) -> Result<Vec<StepRecord>, StoreError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| StoreError::Malformed(format!("step list response: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("steps") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(StoreError::Malformed(format!(
                    "steps field is not a list: {}",
                    other
                )))
            }
        },
        Value::Null => Vec::new(),
        other => {
            return Err(StoreError::Malformed(format!(
                "step list is not a list: {}",
                other
            )))
        }
    };

    Ok(items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect())
}
