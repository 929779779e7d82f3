//! Active-feature detection over workspace status records.
//!
//! Feature progress lives in files this layer does not own:
//! `<workspace>/.claude/feature/<name>/status.json`. The scan reduces that
//! tree to the single most relevant in-flight feature, if any.

use fs_err as fs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// Feature states that no longer count as in-flight.
const TERMINAL_STATUSES: [&str; 2] = ["completed", "abandoned"];

/// The feature selected for the current workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFeature {
    /// Directory name of the feature.
    pub name: String,
    /// Current pipeline stage, 0 when the record does not say.
    pub stage: u32,
    pub status: String,
}

/// On-disk status record. Older writers nest the status under a `feature`
/// object and call the stage field `stage`; both spellings are accepted.
#[derive(Debug, Deserialize)]
struct StatusRecord {
    status: Option<String>,
    current_stage: Option<u32>,
    stage: Option<u32>,
    feature: Option<NestedFeature>,
}

#[derive(Debug, Deserialize)]
struct NestedFeature {
    status: Option<String>,
}

/// Location of the feature tree for a workspace.
pub fn feature_root(workspace: &Path) -> PathBuf {
    workspace.join(".claude").join("feature")
}

/// Scans `root` for the most recently touched feature that is still in
/// flight.
///
/// Malformed or unreadable records are skipped individually; a missing root
/// directory means "no active feature", not an error. Recency is decided on
/// the status file's mtime with strictly-greater replacement, so equal
/// mtimes keep the first find.
pub fn detect_active_feature(root: &Path) -> Option<ActiveFeature> {
    if !root.exists() {
        return None;
    }

    let mut best: Option<(SystemTime, ActiveFeature)> = None;

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        let status_path = entry.path().join("status.json");
        let content = match fs::read_to_string(&status_path) {
            Ok(content) => content,
            Err(_) => continue,
        };

        let record: StatusRecord = match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(err) => {
                debug!(
                    path = %status_path.display(),
                    error = %err,
                    "Skipping malformed feature status"
                );
                continue;
            }
        };

        let StatusRecord {
            status,
            current_stage,
            stage,
            feature,
        } = record;

        let status = status
            .or_else(|| feature.and_then(|f| f.status))
            .unwrap_or_else(|| "in_progress".to_string());
        if TERMINAL_STATUSES.contains(&status.as_str()) {
            continue;
        }

        let modified = match fs::metadata(&status_path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };

        let newer = match &best {
            None => true,
            Some((current, _)) => modified > *current,
        };
        if newer {
            best = Some((
                modified,
                ActiveFeature {
                    name: entry.file_name().to_string_lossy().to_string(),
                    stage: current_stage.or(stage).unwrap_or(0),
                    status,
                },
            ));
        }
    }

    best.map(|(_, feature)| feature)
}
