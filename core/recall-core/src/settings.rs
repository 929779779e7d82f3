//! Hook registration in Claude Code's settings file.
//!
//! The synchronizer follows the sidecar principle - it reads Claude Code's
//! settings but only touches entries it owns, never removing or changing
//! anything else. Ownership is decided by a marker token in the command
//! string, so entries written by older installs (different paths, different
//! timeouts) are still recognized and replaced rather than duplicated.
//! Writes are atomic (temp + rename) to avoid corrupting settings.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use fs_err as fs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{RecallError, Result};
use crate::storage::StorageConfig;

/// Token that marks a hook command as ours.
const HOOK_MARKER: &str = "recall-hook";

/// Hook registrations: (event_name, matcher, subcommand, timeout)
///
/// PostToolUse is scoped to the tools the recorder classifies; the other
/// events fire unconditionally. Stop gets a longer budget because ending a
/// session makes up to three backend calls.
const RECALL_HOOK_EVENTS: [(&str, &str, &str, u32); 3] = [
    ("SessionStart", "", "session-start", 5000),
    ("PostToolUse", "Task|Write|Edit", "tool-use", 5000),
    ("Stop", "", "session-end", 10000),
];

/// Whether one of our registrations is present for an event.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    pub event: &'static str,
    pub installed: bool,
}

/// Installs and removes our hook entries in `settings.json`.
pub struct ConfigSynchronizer {
    storage: StorageConfig,
}

impl ConfigSynchronizer {
    pub fn new(storage: StorageConfig) -> Self {
        Self { storage }
    }

    /// Registers all hook events, replacing any stale entries of ours.
    ///
    /// Safe to run repeatedly: existing marker-bearing entries are dropped
    /// before the fresh ones are appended, so each event ends up with
    /// exactly one of our registrations.
    pub fn install(&self, hook_exe: &Path) -> Result<()> {
        let mut doc = self.load();
        let hooks = doc.hooks.get_or_insert_with(HashMap::new);

        for (event, matcher, subcommand, timeout) in RECALL_HOOK_EVENTS {
            let entries = hooks.entry(event.to_string()).or_default();
            entries.retain(|entry| !entry_is_ours(entry));
            entries.push(build_entry(hook_exe, matcher, subcommand, timeout));
        }

        self.save(&doc)
    }

    /// Removes our hook entries, leaving everything else untouched.
    ///
    /// Event lists that end up empty are dropped, as is the `hooks` key
    /// itself, so an uninstall from a settings file we created leaves no
    /// residue. A missing settings file is a no-op.
    pub fn uninstall(&self) -> Result<()> {
        if !self.storage.claude_settings_file().exists() {
            return Ok(());
        }

        let mut doc = self.load();
        let Some(hooks) = doc.hooks.as_mut() else {
            return Ok(());
        };

        for entries in hooks.values_mut() {
            entries.retain(|entry| !entry_is_ours(entry));
        }
        hooks.retain(|_, entries| !entries.is_empty());
        if hooks.is_empty() {
            doc.hooks = None;
        }

        self.save(&doc)
    }

    /// Reports, per event, whether one of our registrations is in place
    /// with the expected matcher.
    pub fn registration_state(&self) -> Vec<RegistrationState> {
        let doc = self.load();
        let hooks = doc.hooks.unwrap_or_default();

        RECALL_HOOK_EVENTS
            .iter()
            .map(|(event, matcher, _, _)| {
                let installed = hooks
                    .get(*event)
                    .map(|entries| {
                        entries.iter().any(|entry| {
                            entry_is_ours(entry) && entry.matcher.as_deref() == Some(*matcher)
                        })
                    })
                    .unwrap_or(false);
                RegistrationState { event, installed }
            })
            .collect()
    }

    fn load(&self) -> SettingsDocument {
        let path = self.storage.claude_settings_file();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return SettingsDocument::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read settings, starting fresh");
                return SettingsDocument::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "settings.json is malformed, rebuilding");
                SettingsDocument::default()
            }
        }
    }

    fn save(&self, doc: &SettingsDocument) -> Result<()> {
        let path = self.storage.claude_settings_file();
        let parent = path
            .parent()
            .ok_or_else(|| RecallError::NoParentDir(path.clone()))?;
        fs::create_dir_all(parent).map_err(|e| RecallError::Io {
            context: "creating Claude settings directory".to_string(),
            source: e,
        })?;

        let content = serde_json::to_string_pretty(doc).map_err(|e| RecallError::Json {
            context: "serializing settings".to_string(),
            source: e,
        })?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| RecallError::Io {
            context: "creating temp settings file".to_string(),
            source: e,
        })?;
        temp.write_all(content.as_bytes())
            .map_err(|e| RecallError::Io {
                context: "writing temp settings file".to_string(),
                source: e,
            })?;
        temp.flush().map_err(|e| RecallError::Io {
            context: "flushing temp settings file".to_string(),
            source: e,
        })?;
        temp.persist(&path).map_err(|e| RecallError::Io {
            context: "persisting settings".to_string(),
            source: e.error,
        })?;

        Ok(())
    }
}

/// Check if a command string belongs to one of our registrations.
fn is_recall_command(cmd: Option<&str>) -> bool {
    cmd.map(|c| c.contains(HOOK_MARKER)).unwrap_or(false)
}

fn entry_is_ours(entry: &HookEntry) -> bool {
    entry
        .hooks
        .as_ref()
        .map(|cmds| cmds.iter().any(|c| is_recall_command(c.command.as_deref())))
        .unwrap_or(false)
}

fn build_entry(hook_exe: &Path, matcher: &str, subcommand: &str, timeout: u32) -> HookEntry {
    HookEntry {
        matcher: Some(matcher.to_string()),
        hooks: Some(vec![HookCommand {
            kind: Some("command".to_string()),
            command: Some(format!("{} {}", hook_exe.display(), subcommand)),
            timeout: Some(timeout),
            other: HashMap::new(),
        }]),
        other: HashMap::new(),
    }
}

// Unknown fields are captured in `other` maps so settings written by other
// tools round-trip byte-for-byte at the JSON value level.

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    hooks: Option<HashMap<String, Vec<HookEntry>>>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HookEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    matcher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hooks: Option<Vec<HookCommand>>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HookCommand {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}
