use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable classification reported as `error_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    InvalidUrl,
    MissingUrl,
    VideoUnavailable,
    TranscriptsDisabled,
    TooManyRequests,
    IpBlocked,
    EmptyTranscript,
    UnknownError,
    JsonDecodeError,
    ServerError,
}

impl ErrorType {
    pub const ALL: [ErrorType; 10] = [
        ErrorType::InvalidUrl,
        ErrorType::MissingUrl,
        ErrorType::VideoUnavailable,
        ErrorType::TranscriptsDisabled,
        ErrorType::TooManyRequests,
        ErrorType::IpBlocked,
        ErrorType::EmptyTranscript,
        ErrorType::UnknownError,
        ErrorType::JsonDecodeError,
        ErrorType::ServerError,
    ];
}

// Displays as the serialized name, e.g. `TRANSCRIPTS_DISABLED`
impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(name)) => write!(f, "{name}"),
            _ => write!(f, "{self:?}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("YouTube URL is required")]
    MissingUrl,

    #[error("video {video_id} is unavailable: {reason}")]
    VideoUnavailable { video_id: String, reason: String },

    #[error("transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("too many requests to YouTube while fetching video {0}")]
    TooManyRequests(String),

    #[error("YouTube is blocking requests from this IP (video {0})")]
    IpBlocked(String),

    #[error("no usable transcript for video {video_id}, available languages: [{}]", .available.join(", "))]
    NoMatchingTranscript { video_id: String, available: Vec<String> },

    #[error("transcript for video {0} is empty or too short")]
    EmptyTranscript(String),

    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to parse YouTube response: {0}")]
    Parse(String),

    #[error("invalid JSON body: {0}")]
    JsonDecode(#[from] serde_json::Error),

    #[error("internal server error: {0}")]
    Server(String),
}

impl TranscriptError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            TranscriptError::InvalidUrl(_) => ErrorType::InvalidUrl,
            TranscriptError::MissingUrl => ErrorType::MissingUrl,
            TranscriptError::VideoUnavailable { .. } => ErrorType::VideoUnavailable,
            TranscriptError::TranscriptsDisabled(_) => ErrorType::TranscriptsDisabled,
            TranscriptError::TooManyRequests(_) => ErrorType::TooManyRequests,
            TranscriptError::IpBlocked(_) => ErrorType::IpBlocked,
            TranscriptError::EmptyTranscript(_) => ErrorType::EmptyTranscript,
            TranscriptError::NoMatchingTranscript { .. }
            | TranscriptError::Network(_)
            | TranscriptError::Parse(_) => ErrorType::UnknownError,
            TranscriptError::JsonDecode(_) => ErrorType::JsonDecodeError,
            TranscriptError::Server(_) => ErrorType::ServerError,
        }
    }

    /// Language codes offered by the source, when selection found nothing
    pub fn available_languages(&self) -> Option<&[String]> {
        match self {
            TranscriptError::NoMatchingTranscript { available, .. } => Some(available.as_slice()),
            _ => None,
        }
    }
}
