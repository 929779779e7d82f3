//! Client for the compiled backend generation.

use std::path::PathBuf;
use std::process::Command;

use super::exec::{run_capture, CALL_TIMEOUT};
use super::{
    parse_last_session, parse_session_id, parse_steps, FileChangeKind, LastSession, MemoryStore,
    StepRecord, StoreError, ACTION_MAX_CHARS, STORE_DB_ENV, SUMMARY_MAX_CHARS,
};
use crate::format::sanitize_arg;

/// Talks to the `recall` binary.
#[derive(Debug, Clone)]
pub struct BinaryStore {
    program: PathBuf,
    db_path: PathBuf,
}

impl BinaryStore {
    pub fn new(program: PathBuf, db_path: PathBuf) -> Self {
        Self { program, db_path }
    }

    fn run(&self, args: &[&str]) -> Result<String, StoreError> {
        run_capture(
            Command::new(&self.program)
                .env(STORE_DB_ENV, &self.db_path)
                .args(args),
            CALL_TIMEOUT,
        )
    }
}

impl MemoryStore for BinaryStore {
    fn init(&self) -> Result<(), StoreError> {
        self.run(&["init"]).map(|_| ())
    }

    fn start_session(&self, project: &str) -> Result<String, StoreError> {
        let out = self.run(&["session", "start", project])?;
        parse_session_id(&out)
    }

    fn end_session(&self, session_id: &str, summary: &str) -> Result<(), StoreError> {
        let summary = sanitize_arg(summary, SUMMARY_MAX_CHARS);
        self.run(&["session", "end", session_id, &summary])
            .map(|_| ())
    }

    fn last_session(&self, project: &str) -> Result<Option<LastSession>, StoreError> {
        let out = self.run(&["recall", project])?;
        parse_last_session(&out)
    }

    fn list_steps(&self, session_id: &str) -> Result<Vec<StepRecord>, StoreError> {
        let out = self.run(&["step", "list", session_id])?;
        parse_steps(&out)
    }

    fn record_agent_spawn(
        &self,
        session_id: &str,
        agent_name: &str,
        agent_model: &str,
        action: &str,
    ) -> Result<(), StoreError> {
        let action = sanitize_arg(action, ACTION_MAX_CHARS);
        self.run(&[
            "step",
            "record-agent",
            session_id,
            agent_name,
            agent_model,
            &action,
        ])
        .map(|_| ())
    }

    fn record_file_change(
        &self,
        session_id: &str,
        change: FileChangeKind,
        file_path: &str,
    ) -> Result<(), StoreError> {
        let file_path = sanitize_arg(file_path, ACTION_MAX_CHARS);
        self.run(&["step", "record-file", session_id, change.as_str(), &file_path])
            .map(|_| ())
    }

    fn attach_feature(&self, name: &str, project: &str, stage: u32) -> Result<(), StoreError> {
        let stage = stage.to_string();
        self.run(&["feature", "create", name, project, "--stage", &stage])
            .map(|_| ())
    }

    fn describe(&self) -> String {
        format!("recall binary ({})", self.program.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs_err as fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Fake backend that logs its argv (and the db env var) next to itself
    /// and prints a canned response.
    fn fake_backend(temp: &TempDir, response: &str) -> (BinaryStore, PathBuf) {
        let program = temp.path().join("recall");
        let log = temp.path().join("recall.args");
        let body = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$*\" >> \"$0.args\"\nprintf 'db=%s\\n' \"$RECALL_MEMORY_DB\" >> \"$0.args\"\nprintf '%s' '{}'\n",
            response
        );
        fs::write(&program, body).unwrap();
        fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let store = BinaryStore::new(program, temp.path().join("memory.db"));
        (store, log)
    }

    fn logged_args(log: &std::path::Path) -> String {
        fs::read_to_string(log).unwrap()
    }

    #[test]
    fn test_start_session_grammar_and_parse() {
        let temp = TempDir::new().unwrap();
        let (store, log) = fake_backend(&temp, r#"{"session_id":"sess-9"}"#);

        let id = store.start_session("my-project").unwrap();

        assert_eq!(id, "sess-9");
        let args = logged_args(&log);
        assert!(args.contains("session start my-project"));
        assert!(args.contains("db="));
        assert!(args.contains("memory.db"));
    }

    #[test]
    fn test_end_session_neutralizes_summary() {
        let temp = TempDir::new().unwrap();
        let (store, log) = fake_backend(&temp, "{}");

        store
            .end_session("sess-9", "did \"stuff\"\nacross lines")
            .unwrap();

        let args = logged_args(&log);
        assert!(args.contains("session end sess-9"));
        assert!(args.contains("did \\\"stuff\\\" across lines"));
    }

    #[test]
    fn test_record_file_change_grammar() {
        let temp = TempDir::new().unwrap();
        let (store, log) = fake_backend(&temp, "{}");

        store
            .record_file_change("sess-9", FileChangeKind::Edit, "/src/main.rs")
            .unwrap();

        assert!(logged_args(&log).contains("step record-file sess-9 Edit /src/main.rs"));
    }

    #[test]
    fn test_attach_feature_grammar() {
        let temp = TempDir::new().unwrap();
        let (store, log) = fake_backend(&temp, "{}");

        store.attach_feature("auth-flow", "my-project", 3).unwrap();

        assert!(logged_args(&log).contains("feature create auth-flow my-project --stage 3"));
    }

    #[test]
    fn test_failure_exits_surface_as_unavailable() {
        let temp = TempDir::new().unwrap();
        let program = temp.path().join("recall");
        fs::write(&program, "#!/bin/sh\nexit 1\n").unwrap();
        fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
        let store = BinaryStore::new(program, temp.path().join("memory.db"));

        assert!(matches!(
            store.init(),
            Err(StoreError::Unavailable(_))
        ));
    }
}
