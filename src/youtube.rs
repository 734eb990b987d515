use std::sync::LazyLock;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::source::{CaptionList, CaptionSource, CaptionTrack};
use crate::{Segment, TranscriptError, VideoId};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

// The WEB client no longer receives fetchable caption URLs.
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<RawCaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct RawCaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    name: Option<TrackName>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackName {
    #[serde(rename = "simpleText")]
    simple_text: Option<String>,
    runs: Option<Vec<TextRun>>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl TrackName {
    fn text(&self) -> Option<String> {
        self.simple_text
            .clone()
            .or_else(|| self.runs.as_ref()?.first().map(|r| r.text.clone()))
    }
}

/// Caption source backed by YouTube's InnerTube player API
pub struct InnerTubeSource {
    client: reqwest::Client,
    base_url: String,
    hl: String,
}

impl InnerTubeSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, YOUTUBE_BASE_URL)
    }

    /// Point the watch page and player requests at another origin
    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            hl: "en".to_string(),
        }
    }

    async fn fetch_watch_page(&self, video_id: &VideoId) -> Result<String, TranscriptError> {
        let watch_url = format!("{}/watch?v={video_id}", self.base_url);
        debug!("Fetching watch page: {watch_url}");

        let resp = self
            .client
            .get(&watch_url)
            .header("User-Agent", USER_AGENT)
            .header("Accept-Language", "en-US")
            .send()
            .await?;
        let html = check_status(resp, video_id)?.text().await?;

        if html.contains("g-recaptcha") {
            return Err(TranscriptError::IpBlocked(video_id.to_string()));
        }
        Ok(html)
    }

    async fn fetch_player(&self, video_id: &VideoId, api_key: &str) -> Result<InnerTubePlayerResponse, TranscriptError> {
        let player_url = format!("{}/youtubei/v1/player?key={api_key}&prettyPrint=false", self.base_url);

        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": self.hl,
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION
                }
            },
            "videoId": video_id.as_str()
        });

        let resp = self
            .client
            .post(&player_url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        Ok(check_status(resp, video_id)?.json().await?)
    }
}

#[async_trait]
impl CaptionSource for InnerTubeSource {
    async fn list_captions(&self, video_id: &VideoId) -> Result<CaptionList, TranscriptError> {
        let page_html = self.fetch_watch_page(video_id).await?;

        let api_key = extract_api_key(&page_html)
            .ok_or_else(|| TranscriptError::Parse("could not extract InnerTube API key from watch page".to_string()))?;
        debug!("Extracted InnerTube API key: {api_key}");

        let resp = self.fetch_player(video_id, &api_key).await?;
        caption_list(video_id, resp)
    }

    async fn fetch_segments(&self, video_id: &VideoId, track: &CaptionTrack) -> Result<Vec<Segment>, TranscriptError> {
        if track.base_url.contains("&exp=xpe") {
            return Err(TranscriptError::Parse(format!(
                "caption track {} requires a proof-of-origin token",
                track.language_code
            )));
        }

        debug!("Fetching caption track: lang={}", track.language_code);
        let resp = self
            .client
            .get(&track.base_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;
        let caption_xml = check_status(resp, video_id)?.text().await?;

        parse_caption_xml(&caption_xml)
    }
}

fn check_status(resp: reqwest::Response, video_id: &VideoId) -> Result<reqwest::Response, TranscriptError> {
    if resp.status() == StatusCode::TOO_MANY_REQUESTS {
        return Err(TranscriptError::TooManyRequests(video_id.to_string()));
    }
    Ok(resp.error_for_status()?)
}

static API_KEY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#,
        // Fallback: try the newer pattern
        r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("API key pattern is valid"))
    .collect()
});

fn extract_api_key(html: &str) -> Option<String> {
    API_KEY_PATTERNS
        .iter()
        .find_map(|re| re.captures(html))
        .map(|caps| caps[1].to_string())
}

fn check_playability(video_id: &VideoId, status: Option<&PlayabilityStatus>) -> Result<(), TranscriptError> {
    let Some(status) = status else {
        return Ok(());
    };
    let code = status.status.as_deref().unwrap_or("OK");
    let reason = status.reason.clone().unwrap_or_default();

    match code {
        "OK" => Ok(()),
        "LOGIN_REQUIRED" if reason.contains("not a bot") => Err(TranscriptError::IpBlocked(video_id.to_string())),
        _ => Err(TranscriptError::VideoUnavailable {
            video_id: video_id.to_string(),
            reason: if reason.is_empty() { code.to_string() } else { reason },
        }),
    }
}

fn caption_list(video_id: &VideoId, resp: InnerTubePlayerResponse) -> Result<CaptionList, TranscriptError> {
    check_playability(video_id, resp.playability_status.as_ref())?;

    let renderer = resp
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .ok_or_else(|| TranscriptError::TranscriptsDisabled(video_id.to_string()))?;

    let tracks = renderer
        .caption_tracks
        .unwrap_or_default()
        .into_iter()
        .map(|raw| {
            let language_name = raw
                .name
                .as_ref()
                .and_then(TrackName::text)
                .unwrap_or_else(|| raw.language_code.clone());
            CaptionTrack {
                is_generated: raw.kind.as_deref() == Some("asr"),
                base_url: raw.base_url.replace("&fmt=srv3", ""),
                language_code: raw.language_code,
                language_name,
            }
        })
        .collect();

    Ok(CaptionList {
        video_id: video_id.to_string(),
        tracks,
    })
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>, TranscriptError> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current_start: Option<f64> = None;
    let mut current_dur: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"start" => {
                            start = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        b"dur" => {
                            dur = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        _ => {}
                    }
                }
                current_start = start;
                // Some tracks omit dur on the last cue
                current_dur = dur.or(Some(0.0));
            }
            Ok(Event::Empty(_)) => {
                // Self-closing <text .../> with no content
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(start), Some(dur)) = (current_start.take(), current_dur.take()) {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let text = html_escape::decode_html_entities(&raw_text).to_string();
                    if !text.trim().is_empty() {
                        segments.push(Segment {
                            text,
                            start,
                            duration: dur,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(TranscriptError::Parse(format!("error parsing caption XML: {e}"))),
            _ => {}
        }
    }

    Ok(segments)
}
