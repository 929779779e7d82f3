//! Stop hook: end the active session and report what happened in it.

use recall_core::{
    format_duration, locate_backend, EndOutcome, EndReport, Result, SessionLifecycleManager,
    SessionPointer, StorageConfig,
};

pub fn run(storage: &StorageConfig) -> Result<()> {
    let Some(store) = locate_backend(storage) else {
        if SessionPointer::new(storage).load().is_some() {
            println!("Recall: Memory unavailable - session end deferred");
        } else {
            println!("Recall: No active session to end");
        }
        return Ok(());
    };

    let manager = SessionLifecycleManager::new(storage.clone(), store.as_ref());
    match manager.end()? {
        EndOutcome::NoSession => {
            println!("Recall: No active session to end");
        }
        EndOutcome::Ended(report) => {
            println!("{}", render_report(&report));
        }
        EndOutcome::BackendFailed { .. } => {
            println!("Recall: Memory unavailable - session end deferred");
        }
    }

    Ok(())
}

fn render_report(report: &EndReport) -> String {
    let mut lines = vec![
        format!("Recall: Session ended - {}", report.session_id),
        format!("  Duration: {}", format_duration(report.duration_ms)),
        format!("  Steps: {}", report.stats.total_steps),
        format!("  Agents: {}", report.stats.agents_spawned),
    ];
    if let Some(feature) = &report.feature {
        lines.push(format!(
            "  Feature: {} (stage {})",
            feature.name, feature.stage
        ));
    }
    lines.join("\n")
}
