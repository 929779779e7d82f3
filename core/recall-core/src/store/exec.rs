//! Bounded subprocess execution for backend calls.

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use super::StoreError;

/// Deadline for regular backend calls.
pub(crate) const CALL_TIMEOUT: Duration = Duration::from_secs(5);
/// Deadline for liveness probes. Probes stay short because the locator may
/// walk several candidates in a row.
pub(crate) const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

struct PipeOutput {
    stdout: String,
    stderr: String,
}

// Backend payloads are small JSON, so pipes are drained only after exit.
fn read_pipes(child: &mut Child) -> PipeOutput {
    use std::io::Read;

    let mut stdout = String::new();
    if let Some(mut pipe) = child.stdout.take() {
        let _ = pipe.read_to_string(&mut stdout);
    }
    let mut stderr = String::new();
    if let Some(mut pipe) = child.stderr.take() {
        let _ = pipe.read_to_string(&mut stderr);
    }
    PipeOutput { stdout, stderr }
}

/// Runs `command` to completion within `timeout`, returning captured stdout.
///
/// The child is killed at the deadline. Spawn failures, non-zero exits, and
/// timeouts all land in [`StoreError::Unavailable`]; this function never
/// reports `Malformed`.
pub(crate) fn run_capture(command: &mut Command, timeout: Duration) -> Result<String, StoreError> {
    let program = command.get_program().to_string_lossy().to_string();

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| StoreError::Unavailable(format!("failed to spawn {}: {}", program, e)))?;

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let output = read_pipes(&mut child);
                if status.success() {
                    return Ok(output.stdout);
                }
                return Err(StoreError::Unavailable(format!(
                    "{} exited with {}: {}",
                    program,
                    status,
                    output.stderr.trim()
                )));
            }
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(StoreError::Unavailable(format!(
                        "{} timed out after {}ms",
                        program,
                        timeout.as_millis()
                    )));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "failed waiting for {}: {}",
                    program, e
                )));
            }
        }
    }
}

/// Liveness probe: the candidate must answer `--version` cleanly within the
/// probe deadline. Returns the probe's stdout.
pub(crate) fn probe_version(program: &std::ffi::OsStr) -> Option<String> {
    run_capture(Command::new(program).arg("--version"), PROBE_TIMEOUT).ok()
}
