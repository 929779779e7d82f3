//! Storage configuration and path management for Recall.
//!
//! This module provides a centralized `StorageConfig` struct that manages all
//! file paths for Recall data. This abstraction enables:
//!
//! - Easy path changes without hunting through code
//! - Testability via dependency injection (inject mock/temp paths)
//! - Future flexibility (env var overrides, XDG compliance)

use std::path::{Path, PathBuf};

/// Central configuration for all Recall storage paths.
///
/// Production code uses `StorageConfig::default()` which points to `~/.recall/`.
/// Tests use `StorageConfig::with_root(temp_dir)` for isolation.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for all Recall data (default: ~/.recall)
    root: PathBuf,
    /// Root directory for Claude Code data (default: ~/.claude)
    /// Holds the shared settings file and the plugin install tree.
    claude_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = dirs::home_dir().expect("Could not find home directory");
        Self {
            root: home.join(".recall"),
            claude_root: home.join(".claude"),
        }
    }
}

impl StorageConfig {
    /// Creates a StorageConfig with a custom root directory.
    /// Used for testing with temp directories.
    pub fn with_root(root: PathBuf) -> Self {
        let claude_root = root
            .parent()
            .map(|p| p.join(".claude"))
            .unwrap_or_else(|| PathBuf::from("/tmp/.claude"));
        Self { root, claude_root }
    }

    /// Creates a StorageConfig with both custom root and claude_root.
    /// Used for testing scenarios that need to mock Claude data too.
    pub fn with_roots(root: PathBuf, claude_root: PathBuf) -> Self {
        Self { root, claude_root }
    }

    /// Returns the root directory for Recall data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the root directory for Claude Code data.
    pub fn claude_root(&self) -> &Path {
        &self.claude_root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Recall Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to active-session.json (the session pointer).
    pub fn pointer_file(&self) -> PathBuf {
        self.root.join("active-session.json")
    }

    /// Path to memory.db (the backend's persisted store).
    ///
    /// This layer never opens the file itself; the path is handed to the
    /// backend via the `RECALL_MEMORY_DB` environment variable and its
    /// existence gates backend initialization.
    pub fn store_file(&self) -> PathBuf {
        self.root.join("memory.db")
    }

    /// Path to the logs/ directory for hook diagnostics.
    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Claude Code Paths
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to Claude Code's settings file (the shared hooks document).
    pub fn claude_settings_file(&self) -> PathBuf {
        self.claude_root.join("settings.json")
    }

    /// Path to the Recall plugin directory under the Claude root.
    pub fn plugin_dir(&self) -> PathBuf {
        self.claude_root.join("hooks").join("recall")
    }

    /// Path to the plugin-local backend binary candidate.
    pub fn plugin_backend_bin(&self) -> PathBuf {
        self.plugin_dir().join("bin").join("recall")
    }

    /// Path to the script-generation backend, if installed.
    pub fn backend_script(&self) -> PathBuf {
        self.plugin_dir().join("memory").join("recall_memory.py")
    }

    /// Path to the per-user backend binary candidate.
    pub fn user_backend_bin(&self) -> PathBuf {
        self.root
            .parent()
            .map(|p| p.join(".local/bin/recall"))
            .unwrap_or_else(|| PathBuf::from("/usr/local/bin/recall"))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Directory Creation
    // ─────────────────────────────────────────────────────────────────────────────

    /// Ensures the root directory and log directory exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}
