use async_trait::async_trait;

use crate::{Segment, TranscriptError, VideoId};

/// One caption track a video offers
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub language_name: String,
    /// Auto-generated (ASR) rather than manually created
    pub is_generated: bool,
    pub base_url: String,
}

/// Caption tracks for a video, in the order the source listed them
#[derive(Debug, Clone, Default)]
pub struct CaptionList {
    pub video_id: String,
    pub tracks: Vec<CaptionTrack>,
}

impl CaptionList {
    /// Exact language match, manually created tracks first
    pub fn find_language(&self, language_code: &str) -> Option<&CaptionTrack> {
        self.find_manual(|t| t.language_code == language_code)
            .or_else(|| self.find_generated(|t| t.language_code == language_code))
    }

    pub fn find_manual(&self, pred: impl Fn(&CaptionTrack) -> bool) -> Option<&CaptionTrack> {
        self.tracks.iter().find(|t| !t.is_generated && pred(*t))
    }

    pub fn find_generated(&self, pred: impl Fn(&CaptionTrack) -> bool) -> Option<&CaptionTrack> {
        self.tracks.iter().find(|t| t.is_generated && pred(*t))
    }

    pub fn language_codes(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.language_code.clone()).collect()
    }
}

/// Where caption tracks come from
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// List the caption tracks available for a video
    async fn list_captions(&self, video_id: &VideoId) -> Result<CaptionList, TranscriptError>;

    /// Fetch the timed text of one track
    async fn fetch_segments(&self, video_id: &VideoId, track: &CaptionTrack) -> Result<Vec<Segment>, TranscriptError>;
}
