//! Session lifecycle coordination.
//!
//! Start and end are each a short fixed sequence of pointer and backend
//! operations. The ordering is load-bearing in two places: the prior
//! session is queried *before* the new one is created (so the new session
//! does not become its own "last session"), and the pointer is cleared
//! only after the backend confirms the end (so a failed end is retried on
//! the next Stop rather than silently dropped).

use chrono::Utc;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{RecallError, Result};
use crate::feature::{detect_active_feature, feature_root, ActiveFeature};
use crate::format::format_context_message;
use crate::pointer::{SessionHandle, SessionPointer};
use crate::storage::StorageConfig;
use crate::store::{MemoryStore, StepRecord, STEP_AGENT_SPAWN};

/// Step tallies for the closing summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub total_steps: usize,
    pub agents_spawned: usize,
}

impl SessionStats {
    pub fn from_steps(steps: &[StepRecord]) -> Self {
        let agents_spawned = steps
            .iter()
            .filter(|s| s.step_type.as_deref() == Some(STEP_AGENT_SPAWN))
            .count();
        Self {
            total_steps: steps.len(),
            agents_spawned,
        }
    }
}

/// Result of a session-start hook.
#[derive(Debug)]
pub enum StartOutcome {
    /// A recent session for the same project is still active; no backend
    /// calls were made.
    Resumed(SessionHandle),
    /// A new backend session was created and the pointer now names it.
    Started {
        handle: SessionHandle,
        /// Rendered prior-session context, when there is any worth showing.
        prior_context: Option<String>,
    },
    /// No backend answered; the session is simply not tracked.
    Unavailable,
}

/// What a successful end reports back to the user.
#[derive(Debug)]
pub struct EndReport {
    pub session_id: String,
    pub duration_ms: i64,
    pub stats: SessionStats,
    pub feature: Option<ActiveFeature>,
}

/// Result of a session-end hook.
#[derive(Debug)]
pub enum EndOutcome {
    /// No pointer, nothing to end.
    NoSession,
    /// The backend confirmed the end and the pointer was cleared.
    Ended(EndReport),
    /// The backend did not confirm; the pointer stays for a retry.
    BackendFailed { session_id: String },
}

/// Drives session start and end against one located backend.
pub struct SessionLifecycleManager<'a> {
    storage: StorageConfig,
    store: &'a dyn MemoryStore,
}

impl<'a> SessionLifecycleManager<'a> {
    pub fn new(storage: StorageConfig, store: &'a dyn MemoryStore) -> Self {
        Self { storage, store }
    }

    /// Starts (or resumes) a session for the project at `cwd`.
    pub fn start(&self, project: &str, cwd: &str) -> Result<StartOutcome> {
        let now = Utc::now().timestamp_millis();
        let pointer = SessionPointer::new(&self.storage);

        if let Some(handle) = pointer.load() {
            if handle.is_reusable(project, now) {
                debug!(session_id = %handle.session_id, "Reusing active session");
                return Ok(StartOutcome::Resumed(handle));
            }
        }

        self.storage.ensure_dirs().map_err(|e| RecallError::Io {
            context: "creating recall home".to_string(),
            source: e,
        })?;

        if !self.storage.store_file().exists() {
            if let Err(e) = self.store.init() {
                warn!(error = %e, "Backend init failed");
                return Ok(StartOutcome::Unavailable);
            }
        }

        // Query prior context before creating the new session, otherwise
        // the new session shadows the one we want to surface.
        let prior = match self.store.last_session(project) {
            Ok(prior) => prior,
            Err(e) => {
                warn!(error = %e, "Prior session lookup failed");
                None
            }
        };

        let session_id = match self.store.start_session(project) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Backend session start failed");
                return Ok(StartOutcome::Unavailable);
            }
        };

        let handle = SessionHandle {
            session_id,
            project: project.to_string(),
            cwd: cwd.to_string(),
            started_at: now,
        };
        pointer.save(&handle)?;

        let prior_context = prior.and_then(|info| format_context_message(&info, now));
        Ok(StartOutcome::Started {
            handle,
            prior_context,
        })
    }

    /// Ends the active session, if any.
    ///
    /// The feature attach and the step query are best-effort; only the end
    /// call itself decides between `Ended` and `BackendFailed`.
    pub fn end(&self) -> Result<EndOutcome> {
        let now = Utc::now().timestamp_millis();
        let pointer = SessionPointer::new(&self.storage);

        let Some(handle) = pointer.load() else {
            return Ok(EndOutcome::NoSession);
        };

        let feature = detect_active_feature(&feature_root(Path::new(&handle.cwd)));
        if let Some(feature) = &feature {
            if let Err(e) = self
                .store
                .attach_feature(&feature.name, &handle.project, feature.stage)
            {
                warn!(error = %e, feature = %feature.name, "Feature attach failed");
            }
        }

        let stats = match self.store.list_steps(&handle.session_id) {
            Ok(steps) => SessionStats::from_steps(&steps),
            Err(e) => {
                warn!(error = %e, "Step listing failed, reporting zero");
                SessionStats::default()
            }
        };

        let duration_ms = handle.age_ms(now);
        let summary = compose_summary(&handle.project, duration_ms, stats, feature.as_ref());

        match self.store.end_session(&handle.session_id, &summary) {
            Ok(()) => {
                pointer.clear()?;
                Ok(EndOutcome::Ended(EndReport {
                    session_id: handle.session_id,
                    duration_ms,
                    stats,
                    feature,
                }))
            }
            Err(e) => {
                warn!(
                    session_id = %handle.session_id,
                    error = %e,
                    "Backend session end failed, keeping pointer"
                );
                Ok(EndOutcome::BackendFailed {
                    session_id: handle.session_id,
                })
            }
        }
    }
}

fn compose_summary(
    project: &str,
    duration_ms: i64,
    stats: SessionStats,
    feature: Option<&ActiveFeature>,
) -> String {
    let mut summary = format!(
        "Session in {} ({}): {} steps, {} agents spawned",
        project,
        crate::format::format_duration(duration_ms),
        stats.total_steps,
        stats.agents_spawned
    );
    if let Some(feature) = feature {
        summary.push_str(&format!(". Feature: {} (stage {})", feature.name, feature.stage));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::REUSE_WINDOW_MS;
    use crate::store::{FileChangeKind, LastSession, StoreError};
    use fs_err as fs;
    use std::cell::RefCell;
    use std::result::Result;
    use tempfile::TempDir;

    /// Store double with scripted answers and a call log.
    #[derive(Default)]
    struct ScriptedStore {
        calls: RefCell<Vec<String>>,
        prior: Option<LastSession>,
        steps: Vec<StepRecord>,
        fail_start: bool,
        fail_end: bool,
        fail_steps: bool,
    }

    impl ScriptedStore {
        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl MemoryStore for ScriptedStore {
        fn init(&self) -> Result<(), StoreError> {
            self.calls.borrow_mut().push("init".to_string());
            Ok(())
        }

        fn start_session(&self, project: &str) -> Result<String, StoreError> {
            self.calls.borrow_mut().push(format!("start {}", project));
            if self.fail_start {
                return Err(StoreError::Unavailable("scripted".to_string()));
            }
            Ok("sess-new".to_string())
        }

        fn end_session(&self, session_id: &str, summary: &str) -> Result<(), StoreError> {
            self.calls
                .borrow_mut()
                .push(format!("end {} {}", session_id, summary));
            if self.fail_end {
                return Err(StoreError::Unavailable("scripted".to_string()));
            }
            Ok(())
        }

        fn last_session(&self, project: &str) -> Result<Option<LastSession>, StoreError> {
            self.calls
                .borrow_mut()
                .push(format!("last_session {}", project));
            Ok(self.prior.clone())
        }

        fn list_steps(&self, session_id: &str) -> Result<Vec<StepRecord>, StoreError> {
            self.calls.borrow_mut().push(format!("steps {}", session_id));
            if self.fail_steps {
                return Err(StoreError::Unavailable("scripted".to_string()));
            }
            Ok(self.steps.clone())
        }

        fn record_agent_spawn(
            &self,
            _session_id: &str,
            _agent_name: &str,
            _agent_model: &str,
            _action: &str,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        fn record_file_change(
            &self,
            _session_id: &str,
            _change: FileChangeKind,
            _file_path: &str,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        fn attach_feature(&self, name: &str, project: &str, stage: u32) -> Result<(), StoreError> {
            self.calls
                .borrow_mut()
                .push(format!("attach {} {} {}", name, project, stage));
            Ok(())
        }

        fn describe(&self) -> String {
            "scripted store".to_string()
        }
    }

    fn test_storage(temp: &TempDir) -> StorageConfig {
        StorageConfig::with_roots(temp.path().join(".recall"), temp.path().join(".claude"))
    }

    fn save_pointer(storage: &StorageConfig, project: &str, cwd: &str, age_ms: i64) {
        let handle = SessionHandle {
            session_id: "sess-9".to_string(),
            project: project.to_string(),
            cwd: cwd.to_string(),
            started_at: Utc::now().timestamp_millis() - age_ms,
        };
        SessionPointer::new(storage).save(&handle).unwrap();
    }

    fn write_feature(workspace: &Path, name: &str, body: &str) {
        let dir = workspace.join(".claude/feature").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("status.json"), body).unwrap();
    }

    #[test]
    fn test_stats_count_agent_spawns() {
        let steps = vec![
            StepRecord {
                step_type: Some("agent_spawn".to_string()),
            },
            StepRecord {
                step_type: Some("file_modify".to_string()),
            },
            StepRecord {
                step_type: Some("agent_spawn".to_string()),
            },
            StepRecord { step_type: None },
        ];
        let stats = SessionStats::from_steps(&steps);
        assert_eq!(stats.total_steps, 4);
        assert_eq!(stats.agents_spawned, 2);
    }

    #[test]
    fn test_start_reuses_recent_session_in_same_project() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(&temp);
        save_pointer(&storage, "my-project", "/work/my-project", 60_000);

        let store = ScriptedStore::default();
        let manager = SessionLifecycleManager::new(storage, &store);
        let outcome = manager.start("my-project", "/work/my-project").unwrap();

        match outcome {
            StartOutcome::Resumed(handle) => assert_eq!(handle.session_id, "sess-9"),
            other => panic!("expected Resumed, got {:?}", other),
        }
        // The fast path makes no backend calls at all
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_start_replaces_session_outside_reuse_window() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(&temp);
        save_pointer(
            &storage,
            "my-project",
            "/work/my-project",
            REUSE_WINDOW_MS + 60_000,
        );

        let store = ScriptedStore::default();
        let manager = SessionLifecycleManager::new(storage.clone(), &store);
        let outcome = manager.start("my-project", "/work/my-project").unwrap();

        assert!(matches!(outcome, StartOutcome::Started { .. }));
        let saved = SessionPointer::new(&storage).load().unwrap();
        assert_eq!(saved.session_id, "sess-new");
    }

    #[test]
    fn test_start_ignores_pointer_from_other_project() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(&temp);
        save_pointer(&storage, "other-project", "/work/other-project", 60_000);

        let store = ScriptedStore::default();
        let manager = SessionLifecycleManager::new(storage, &store);
        let outcome = manager.start("my-project", "/work/my-project").unwrap();

        assert!(matches!(outcome, StartOutcome::Started { .. }));
    }

    #[test]
    fn test_start_queries_prior_context_before_creating_session() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(&temp);

        let store = ScriptedStore {
            prior: Some(LastSession {
                feature_name: Some("auth-flow".to_string()),
                feature_status: Some("in_progress".to_string()),
                current_stage: Some(3),
                ..Default::default()
            }),
            ..Default::default()
        };
        let manager = SessionLifecycleManager::new(storage, &store);
        let outcome = manager.start("my-project", "/work/my-project").unwrap();

        // Fresh store file, so init runs, then recall, then creation
        assert_eq!(
            store.calls(),
            ["init", "last_session my-project", "start my-project"]
        );
        match outcome {
            StartOutcome::Started { prior_context, .. } => {
                let context = prior_context.expect("context should render");
                assert!(context.contains("auth-flow"));
            }
            other => panic!("expected Started, got {:?}", other),
        }
    }

    #[test]
    fn test_start_unavailable_backend_leaves_no_pointer() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(&temp);

        let store = ScriptedStore {
            fail_start: true,
            ..Default::default()
        };
        let manager = SessionLifecycleManager::new(storage.clone(), &store);
        let outcome = manager.start("my-project", "/work/my-project").unwrap();

        assert!(matches!(outcome, StartOutcome::Unavailable));
        assert!(SessionPointer::new(&storage).load().is_none());
    }

    #[test]
    fn test_end_without_pointer_is_noop() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(&temp);

        let store = ScriptedStore::default();
        let manager = SessionLifecycleManager::new(storage, &store);
        let outcome = manager.end().unwrap();

        assert!(matches!(outcome, EndOutcome::NoSession));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_end_composes_zero_step_summary() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(&temp);
        let workspace = temp.path().join("my-project");
        fs::create_dir_all(&workspace).unwrap();
        save_pointer(
            &storage,
            "my-project",
            workspace.to_str().unwrap(),
            5 * 60_000,
        );

        let store = ScriptedStore::default();
        let manager = SessionLifecycleManager::new(storage.clone(), &store);
        let outcome = manager.end().unwrap();

        assert!(matches!(outcome, EndOutcome::Ended(_)));
        let calls = store.calls();
        assert!(calls.contains(
            &"end sess-9 Session in my-project (5 minutes): 0 steps, 0 agents spawned".to_string()
        ));
        assert!(SessionPointer::new(&storage).load().is_none());
    }

    #[test]
    fn test_end_attaches_feature_and_extends_summary() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(&temp);
        let workspace = temp.path().join("my-project");
        write_feature(
            &workspace,
            "auth-flow",
            r#"{"status": "in_progress", "current_stage": 4}"#,
        );
        save_pointer(
            &storage,
            "my-project",
            workspace.to_str().unwrap(),
            10 * 60_000,
        );

        let store = ScriptedStore::default();
        let manager = SessionLifecycleManager::new(storage, &store);
        let outcome = manager.end().unwrap();

        let calls = store.calls();
        assert!(calls.contains(&"attach auth-flow my-project 4".to_string()));
        let end_call = calls.iter().find(|c| c.starts_with("end ")).unwrap();
        assert!(end_call.ends_with(". Feature: auth-flow (stage 4)"));

        match outcome {
            EndOutcome::Ended(report) => {
                let feature = report.feature.unwrap();
                assert_eq!(feature.name, "auth-flow");
                assert_eq!(feature.stage, 4);
            }
            other => panic!("expected Ended, got {:?}", other),
        }
    }

    #[test]
    fn test_end_counts_steps_in_summary() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(&temp);
        let workspace = temp.path().join("my-project");
        fs::create_dir_all(&workspace).unwrap();
        save_pointer(&storage, "my-project", workspace.to_str().unwrap(), 60_000);

        let store = ScriptedStore {
            steps: vec![
                StepRecord {
                    step_type: Some("agent_spawn".to_string()),
                },
                StepRecord {
                    step_type: Some("file_modify".to_string()),
                },
                StepRecord {
                    step_type: Some("agent_spawn".to_string()),
                },
            ],
            ..Default::default()
        };
        let manager = SessionLifecycleManager::new(storage, &store);
        let outcome = manager.end().unwrap();

        match outcome {
            EndOutcome::Ended(report) => {
                assert_eq!(report.stats.total_steps, 3);
                assert_eq!(report.stats.agents_spawned, 2);
            }
            other => panic!("expected Ended, got {:?}", other),
        }
        let calls = store.calls();
        let end_call = calls.iter().find(|c| c.starts_with("end ")).unwrap();
        assert!(end_call.contains("3 steps, 2 agents spawned"));
    }

    #[test]
    fn test_end_reports_zero_when_step_listing_fails() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(&temp);
        let workspace = temp.path().join("my-project");
        fs::create_dir_all(&workspace).unwrap();
        save_pointer(&storage, "my-project", workspace.to_str().unwrap(), 60_000);

        let store = ScriptedStore {
            fail_steps: true,
            ..Default::default()
        };
        let manager = SessionLifecycleManager::new(storage, &store);
        let outcome = manager.end().unwrap();

        match outcome {
            EndOutcome::Ended(report) => assert_eq!(report.stats, SessionStats::default()),
            other => panic!("expected Ended, got {:?}", other),
        }
    }

    #[test]
    fn test_end_keeps_pointer_when_backend_fails() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(&temp);
        let workspace = temp.path().join("my-project");
        fs::create_dir_all(&workspace).unwrap();
        save_pointer(&storage, "my-project", workspace.to_str().unwrap(), 60_000);

        let store = ScriptedStore {
            fail_end: true,
            ..Default::default()
        };
        let manager = SessionLifecycleManager::new(storage.clone(), &store);
        let outcome = manager.end().unwrap();

        match outcome {
            EndOutcome::BackendFailed { session_id } => assert_eq!(session_id, "sess-9"),
            other => panic!("expected BackendFailed, got {:?}", other),
        }
        let kept = SessionPointer::new(&storage).load().unwrap();
        assert_eq!(kept.session_id, "sess-9");
    }
}
