use crate::{Segment, TranscriptResult};

/// Render segments as plain text (one segment per line, no timestamps)
pub fn render_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a result the way the HTTP endpoint returns it
pub fn render_json(result: &TranscriptResult) -> String {
    serde_json::to_string_pretty(result).unwrap_or_default()
}

/// Transcript text on success, `error_type: message` otherwise
pub fn render_plain(result: &TranscriptResult) -> String {
    match result {
        TranscriptResult::Success { transcript, .. } => transcript.clone(),
        TranscriptResult::Failure { error, error_type, .. } => format!("{error_type}: {error}"),
    }
}
