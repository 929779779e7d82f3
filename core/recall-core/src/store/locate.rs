//! Backend discovery.
//!
//! Candidates are probed in a fixed priority order: the `recall` binary on
//! PATH, the plugin-local install, the per-user install, then the script
//! generation behind a Python 3 interpreter. The first candidate that
//! answers a liveness probe wins.

use std::ffi::OsStr;
use std::path::PathBuf;

use tracing::debug;

use super::binary::BinaryStore;
use super::exec::probe_version;
use super::script::ScriptStore;
use super::MemoryStore;
use crate::storage::StorageConfig;

/// Interpreter commands tried for the script generation, in order.
const INTERPRETERS: [&str; 2] = ["python3", "python"];

/// Resolves a working backend, or `None` when neither generation is
/// installed. Probe failures are expected and only logged at debug level.
pub fn locate_backend(storage: &StorageConfig) -> Option<Box<dyn MemoryStore>> {
    let db_path = storage.store_file();

    let candidates = [
        PathBuf::from("recall"),
        storage.plugin_backend_bin(),
        storage.user_backend_bin(),
    ];
    for candidate in candidates {
        if probe_version(candidate.as_os_str()).is_some() {
            debug!(backend = %candidate.display(), "Using binary backend");
            return Some(Box::new(BinaryStore::new(candidate, db_path.clone())));
        }
        debug!(backend = %candidate.display(), "Binary candidate did not answer");
    }

    let script = storage.backend_script();
    if script.exists() {
        for interpreter in INTERPRETERS {
            let banner = match probe_version(OsStr::new(interpreter)) {
                Some(banner) => banner,
                None => continue,
            };
            if banner.contains("Python 3") {
                debug!(interpreter, "Using script backend");
                return Some(Box::new(ScriptStore::new(
                    interpreter.to_string(),
                    script,
                    db_path,
                )));
            }
            debug!(interpreter, banner = banner.trim(), "Interpreter is not Python 3");
        }
    }

    None
}
