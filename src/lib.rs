pub mod config;
pub mod error;
pub mod output;
pub mod resolver;
pub mod server;
pub mod source;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use error::{ErrorType, TranscriptError};

/// A single captioned segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Canonical 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of resolving one URL, serialized as the HTTP response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscriptResult {
    Success {
        success: bool,
        transcript: String,
        language: String,
        video_id: String,
    },
    Failure {
        success: bool,
        error: String,
        error_type: ErrorType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        available_languages: Option<Vec<String>>,
    },
}

impl TranscriptResult {
    pub fn success(transcript: String, language: String, video_id: &VideoId) -> Self {
        TranscriptResult::Success {
            success: true,
            transcript,
            language,
            video_id: video_id.to_string(),
        }
    }

    pub fn failure(err: &TranscriptError) -> Self {
        TranscriptResult::Failure {
            success: false,
            error: err.to_string(),
            error_type: err.error_type(),
            available_languages: err.available_languages().map(|langs| langs.to_vec()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TranscriptResult::Success { .. })
    }

    pub fn error_type(&self) -> Option<ErrorType> {
        match self {
            TranscriptResult::Success { .. } => None,
            TranscriptResult::Failure { error_type, .. } => Some(*error_type),
        }
    }
}

impl From<TranscriptError> for TranscriptResult {
    fn from(err: TranscriptError) -> Self {
        TranscriptResult::failure(&err)
    }
}

// Each pattern matches a distinct URL shape, so the first hit is the only hit.
// All of them are anchored at the host so look-alike domains don't match.
static VIDEO_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // youtube.com/watch?v=ID, also with v after other query params
        r"^(?:https?://)?(?:[\w-]+\.)?youtube\.com/watch\?(?:[^#]*&)?v=([a-zA-Z0-9_-]{11})",
        // youtu.be/ID
        r"^(?:https?://)?youtu\.be/([a-zA-Z0-9_-]{11})",
        // youtube.com/embed/ID, youtube.com/shorts/ID
        r"^(?:https?://)?(?:[\w-]+\.)?youtube\.com/(?:embed|shorts)/([a-zA-Z0-9_-]{11})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("video ID pattern is valid"))
    .collect()
});

/// Extract video ID from the supported YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<VideoId> {
    let input = input.trim();

    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(input))
        .map(|caps| VideoId(caps[1].to_string()))
}
