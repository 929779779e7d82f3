//! Human-readable formatting for session summaries and carried-over context.
//!
//! Everything here is pure string code; callers supply timestamps so tests
//! stay deterministic.

use crate::store::LastSession;

const BORDER: &str = "+----------------------------------------------------------------------+";
const BLANK: &str = "|                                                                      |";

/// Box rows are padded to 71 columns then closed, giving a 72-column frame.
fn pad_row(content: String) -> String {
    format!("{:<71}|", content)
}

/// Formats an elapsed duration: minutes below one hour, `Xh Ym` above.
pub fn format_duration(duration_ms: i64) -> String {
    let minutes = (duration_ms / 60_000).max(0);
    if minutes < 60 {
        format!("{} minutes", minutes)
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

/// Formats how long ago a millisecond timestamp was, relative to `now_ms`.
pub fn format_time_ago(timestamp_ms: Option<i64>, now_ms: i64) -> String {
    let Some(ts) = timestamp_ms else {
        return "unknown".to_string();
    };

    let diff_min = (now_ms - ts) / 60_000;
    let diff_hour = diff_min / 60;
    let diff_day = diff_hour / 24;

    if diff_min < 1 {
        "just now".to_string()
    } else if diff_min < 60 {
        format!("{} minutes ago", diff_min)
    } else if diff_hour < 24 {
        format!("{} hours ago", diff_hour)
    } else if diff_day < 7 {
        format!("{} days ago", diff_day)
    } else {
        format!("{} weeks ago", diff_day / 7)
    }
}

/// Neutralizes a free-text value before it is handed to the backend as a
/// positional argument: quotes are escaped, newlines collapse to spaces,
/// and the result is truncated to `max_chars`.
pub fn sanitize_arg(value: &str, max_chars: usize) -> String {
    let cleaned = value.replace('"', "\\\"").replace('\n', " ");
    match cleaned.char_indices().nth(max_chars) {
        Some((idx, _)) => cleaned[..idx].to_string(),
        None => cleaned,
    }
}

/// Builds the context box injected into a fresh session's transcript when an
/// unfinished feature carries over from the previous session.
///
/// Returns `None` when there is nothing worth surfacing: no prior feature,
/// or the feature already completed.
pub fn format_context_message(info: &LastSession, now_ms: i64) -> Option<String> {
    let feature_name = info.feature_name.as_deref()?;
    if info.feature_status.as_deref() == Some("completed") {
        return None;
    }

    let time_ago = format_time_ago(info.started_at, now_ms);
    let stage = info.current_stage.unwrap_or(0);
    let stage_name = info.stage_name.as_deref().unwrap_or("Unknown");

    let mut lines = vec![
        String::new(),
        BORDER.to_string(),
        pad_row("|  RECALL MEMORY: Last session detected".to_string()),
        BORDER.to_string(),
        pad_row(format!("|  Feature: {}", feature_name)),
        pad_row(format!("|  Stage: {}/8 ({})", stage, stage_name)),
        pad_row(format!("|  Last active: {}", time_ago)),
        BLANK.to_string(),
    ];

    if !info.last_actions.is_empty() {
        lines.push(pad_row("|  Last actions:".to_string()));
        let tail_start = info.last_actions.len().saturating_sub(3);
        for action in &info.last_actions[tail_start..] {
            let shown = if action.chars().count() > 60 {
                let cut: String = action.chars().take(57).collect();
                format!("{}...", cut)
            } else {
                action.clone()
            };
            lines.push(pad_row(format!("|  - {}", shown)));
        }
        lines.push(BLANK.to_string());
    }

    if let Some(next_stage) = info.next_stage {
        let next_agent = info.next_agent.as_deref().unwrap_or("Unknown");
        let next_name = info.next_stage_name.as_deref().unwrap_or("Unknown");
        lines.push(pad_row(format!(
            "|  Recommendation: Continue with Stage {} ({} - {})?",
            next_stage, next_agent, next_name
        )));
        lines.push(pad_row(
            "|  Say \"continue\" or \"/recall\" to resume".to_string(),
        ));
    }

    lines.push(BORDER.to_string());
    lines.push(String::new());

    Some(lines.join("\n"))
}
