//! Client for the script backend generation.

use std::path::PathBuf;
use std::process::Command;

use super::exec::{run_capture, CALL_TIMEOUT};
use super::{
    parse_last_session, parse_session_id, parse_steps, FileChangeKind, LastSession, MemoryStore,
    StepRecord, StoreError, ACTION_MAX_CHARS, STEP_AGENT_SPAWN, STEP_FILE_MODIFY, STORE_DB_ENV,
    SUMMARY_MAX_CHARS,
};
use crate::format::sanitize_arg;

/// Talks to `recall_memory.py` through a Python 3 interpreter.
///
/// The script grammar predates the binary's: recall is spelled
/// `last-session`, step listing is `query steps`, and step recording goes
/// through the generic `step` command with `--agent=`/`--model=` options.
#[derive(Debug, Clone)]
pub struct ScriptStore {
    interpreter: String,
    script: PathBuf,
    db_path: PathBuf,
}

impl ScriptStore {
    pub fn new(interpreter: String, script: PathBuf, db_path: PathBuf) -> Self {
        Self {
            interpreter,
            script,
            db_path,
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, StoreError> {
        run_capture(
            Command::new(&self.interpreter)
                .arg(&self.script)
                .env(STORE_DB_ENV, &self.db_path)
                .args(args),
            CALL_TIMEOUT,
        )
    }
}

impl MemoryStore for ScriptStore {
    fn init(&self) -> Result<(), StoreError> {
        self.run(&["init"]).map(|_| ())
    }

    fn start_session(&self, project: &str) -> Result<String, StoreError> {
        let out = self.run(&["session", "start", project])?;
        parse_session_id(&out)
    }

    fn end_session(&self, session_id: &str, summary: &str) -> Result<(), StoreError> {
        let summary = sanitize_arg(summary, SUMMARY_MAX_CHARS);
        // The script takes a positional terminal status; this layer only
        // ever sends completed.
        self.run(&["session", "end", session_id, &summary, "completed"])
            .map(|_| ())
    }

    fn last_session(&self, project: &str) -> Result<Option<LastSession>, StoreError> {
        let out = self.run(&["last-session", project])?;
        parse_last_session(&out)
    }

    fn list_steps(&self, session_id: &str) -> Result<Vec<StepRecord>, StoreError> {
        let out = self.run(&["query", "steps", session_id])?;
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
        let agent = format!("--agent={}", agent_name);
        let model = format!("--model={}", agent_model);
        self.run(&["step", session_id, STEP_AGENT_SPAWN, &action, &agent, &model])
            .map(|_| ())
    }

    fn record_file_change(
        &self,
        session_id: &str,
        change: FileChangeKind,
        file_path: &str,
    ) -> Result<(), StoreError> {
        let action = format!("{}: {}", change, sanitize_arg(file_path, ACTION_MAX_CHARS));
        self.run(&["step", session_id, STEP_FILE_MODIFY, &action])
            .map(|_| ())
    }

    fn attach_feature(&self, name: &str, project: &str, stage: u32) -> Result<(), StoreError> {
        let stage = format!("--stage={}", stage);
        self.run(&["feature", "update", name, project, &stage])
            .map(|_| ())
    }

    fn describe(&self) -> String {
        format!(
            "recall script ({} {})",
            self.interpreter,
            self.script.display()
        )
    }
}
