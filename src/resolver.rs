use std::sync::Arc;

use log::{debug, info, warn};

use crate::output::render_text;
use crate::source::{CaptionList, CaptionSource, CaptionTrack};
use crate::{TranscriptError, TranscriptResult, VideoId, extract_video_id};

/// Transcripts shorter than this (after trimming) are rejected
pub const MIN_TRANSCRIPT_CHARS: usize = 10;

/// Default language priority, tried before any manual or generated track
pub const DEFAULT_LANGUAGES: &[&str] = &["zh-TW", "zh-CN", "zh", "en"];

/// One step of the track selection chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preference {
    Language(String),
    AnyManual,
    AnyGenerated,
}

impl Preference {
    fn pick<'a>(&self, list: &'a CaptionList) -> Option<&'a CaptionTrack> {
        match self {
            Preference::Language(code) => list.find_language(code),
            Preference::AnyManual => list.find_manual(|_| true),
            Preference::AnyGenerated => list.find_generated(|_| true),
        }
    }
}

/// Languages in order, then any manual track, then any generated track
pub fn preference_chain<S: AsRef<str>>(languages: &[S]) -> Vec<Preference> {
    languages
        .iter()
        .map(|l| Preference::Language(l.as_ref().to_string()))
        .chain([Preference::AnyManual, Preference::AnyGenerated])
        .collect()
}

/// First track satisfied by the chain, in chain order
pub fn select_track<'a>(list: &'a CaptionList, chain: &[Preference]) -> Option<&'a CaptionTrack> {
    chain.iter().find_map(|pref| {
        let found = pref.pick(list);
        if found.is_none() {
            debug!("No track for {pref:?}");
        }
        found
    })
}

/// Turns a YouTube URL into a transcript using a caption source
#[derive(Clone)]
pub struct Resolver {
    source: Arc<dyn CaptionSource>,
    chain: Arc<Vec<Preference>>,
}

impl Resolver {
    pub fn new(source: Arc<dyn CaptionSource>) -> Self {
        Self::with_languages(source, DEFAULT_LANGUAGES)
    }

    pub fn with_languages<S: AsRef<str>>(source: Arc<dyn CaptionSource>, languages: &[S]) -> Self {
        Self {
            source,
            chain: Arc::new(preference_chain(languages)),
        }
    }

    /// Resolve a URL; every failure is folded into the result
    pub async fn resolve(&self, url: &str) -> TranscriptResult {
        match self.try_resolve(url).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Transcript resolution failed for {url}: {e}");
                TranscriptResult::failure(&e)
            }
        }
    }

    async fn try_resolve(&self, url: &str) -> Result<TranscriptResult, TranscriptError> {
        let video_id = extract_video_id(url).ok_or_else(|| TranscriptError::InvalidUrl(url.trim().to_string()))?;
        debug!("Resolving transcript for video {video_id}");

        let list = self.source.list_captions(&video_id).await?;
        debug!("Available caption languages: {:?}", list.language_codes());

        let track = select_track(&list, &self.chain).ok_or_else(|| TranscriptError::NoMatchingTranscript {
            video_id: video_id.to_string(),
            available: list.language_codes(),
        })?;
        debug!(
            "Selected track: lang={} generated={}",
            track.language_code, track.is_generated
        );

        let text = self.fetch_text(&video_id, track).await?;

        info!(
            "Resolved transcript for {video_id}: lang={} chars={}",
            track.language_code,
            text.chars().count()
        );
        Ok(TranscriptResult::success(text, track.language_code.clone(), &video_id))
    }

    async fn fetch_text(&self, video_id: &VideoId, track: &CaptionTrack) -> Result<String, TranscriptError> {
        let mut segments = self.source.fetch_segments(video_id, track).await?;
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));

        let text = render_text(&segments);
        if text.trim().chars().count() < MIN_TRANSCRIPT_CHARS {
            return Err(TranscriptError::EmptyTranscript(video_id.to_string()));
        }
        Ok(text)
    }
}
