//! Classification and recording of tool invocations.
//!
//! PostToolUse hooks deliver a JSON payload on stdin describing the tool
//! that just ran. Task invocations become agent-spawn steps, Write and
//! Edit become file-change steps, everything else is ignored. Recording
//! is fire-and-forget: a backend failure is logged, never surfaced.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::pointer::SessionPointer;
use crate::storage::StorageConfig;
use crate::store::{FileChangeKind, MemoryStore};

/// Agent names probed for in Task tool input, in priority order.
const KNOWN_AGENTS: [&str; 7] = [
    "metis",
    "athena",
    "hephaestus",
    "apollo",
    "artemis",
    "ares",
    "hermes",
];

/// Hook payload for a PostToolUse event. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ToolEvent {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: ToolInput,
}

/// Union of the input fields we care about across Task, Write and Edit.
#[derive(Debug, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub subagent_type: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
}

/// What a tool invocation was classified as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAction {
    AgentSpawn {
        agent: String,
        model: String,
        action: String,
    },
    FileChange {
        kind: FileChangeKind,
        path: String,
    },
}

/// Identifies which agent a Task invocation spawned.
///
/// All three input fields are lowercased before matching so that
/// "Apollo: review the diff" and a subagent_type of "Apollo" both hit.
/// When no known agent matches, the subagent_type is reported verbatim.
pub fn detect_agent(input: &ToolInput) -> String {
    let description = input.description.as_deref().unwrap_or("").to_lowercase();
    let prompt = input.prompt.as_deref().unwrap_or("").to_lowercase();
    let subagent = input.subagent_type.as_deref().unwrap_or("").to_lowercase();

    for agent in KNOWN_AGENTS {
        if description.contains(agent) || prompt.contains(agent) || subagent.contains(agent) {
            return agent.to_string();
        }
    }

    input
        .subagent_type
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Maps a tool event to the step it should record, if any.
pub fn classify_tool_event(event: &ToolEvent) -> Option<ToolAction> {
    match event.tool_name.as_str() {
        "Task" => {
            let agent = detect_agent(&event.tool_input);
            let action = event
                .tool_input
                .description
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "Agent task".to_string());
            let model = event
                .tool_input
                .model
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "sonnet".to_string());
            Some(ToolAction::AgentSpawn {
                agent,
                model,
                action,
            })
        }
        "Write" => Some(ToolAction::FileChange {
            kind: FileChangeKind::Write,
            path: file_path_or_unknown(&event.tool_input),
        }),
        "Edit" => Some(ToolAction::FileChange {
            kind: FileChangeKind::Edit,
            path: file_path_or_unknown(&event.tool_input),
        }),
        _ => None,
    }
}

fn file_path_or_unknown(input: &ToolInput) -> String {
    input
        .file_path
        .clone()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Forwards classified tool events to the active session's step log.
pub struct ToolEventRecorder {
    storage: StorageConfig,
}

impl ToolEventRecorder {
    pub fn new(storage: StorageConfig) -> Self {
        Self { storage }
    }

    /// Records the step for a raw hook payload.
    ///
    /// Returns the classified action, or `None` when nothing was recorded:
    /// no active session, unparseable payload, or a tool we don't track.
    pub fn record(&self, store: &dyn MemoryStore, raw: &str) -> Option<ToolAction> {
        let handle = SessionPointer::new(&self.storage).load()?;

        let event: ToolEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "Ignoring unparseable tool event");
                return None;
            }
        };

        let action = classify_tool_event(&event)?;

        let outcome = match &action {
            ToolAction::AgentSpawn {
                agent,
                model,
                action,
            } => store.record_agent_spawn(&handle.session_id, agent, model, action),
            ToolAction::FileChange { kind, path } => {
                store.record_file_change(&handle.session_id, *kind, path)
            }
        };

        if let Err(e) = outcome {
            warn!(
                session_id = %handle.session_id,
                error = %e,
                "Failed to record step"
            );
        }

        Some(action)
    }
}
