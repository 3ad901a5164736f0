//! YouTube transcripts: video-ID extraction and caption retrieval.
//!
//! [`YouTubeTranscripts`] reads the `captionTracks` array embedded in the
//! watch page, picks the best track for the preferred languages and
//! downloads its timed-text XML. Both body formats are read: the classic
//! `<text start dur>` (seconds) and srv3 `<p t d>` (milliseconds). Fragments
//! are unescaped, stripped of inline markup, ordered by start time and joined
//! with single spaces.

use crate::config::DocmindConfig;
use crate::error::DocmindError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Duration;
use tracing::{debug, info};

static VIDEO_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:youtube\.com/(?:[^/\n\s]+/\S+/|(?:v|e(?:mbed)?)/|\S*?[?&]v=)|youtu\.be/)([a-zA-Z0-9_-]{11})",
    )
    .unwrap()
});

// Markup that survives the second unescape pass, e.g. `&lt;i&gt;`.
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const CAPTION_MARKER: &str = "\"captionTracks\":";

/// The 11-character video ID in a YouTube URL, if there is one.
///
/// Recognises `watch?v=`, `embed/`, `v/`, `e/`, `youtu.be/` and other
/// query-string forms.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// One timed caption fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

/// Somewhere captions can be fetched from.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// All caption fragments for a video, in any order.
    async fn segments(&self, video_id: &str) -> Result<Vec<TranscriptSegment>, DocmindError>;
}

/// Fragments ordered by start time and joined with single spaces.
pub fn join_segments(mut segments: Vec<TranscriptSegment>) -> String {
    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fetch and join the transcript for a video ID.
pub async fn fetch_transcript(
    source: &dyn TranscriptSource,
    video_id: &str,
) -> Result<String, DocmindError> {
    let segments = source.segments(video_id).await?;
    if segments.is_empty() {
        return Err(DocmindError::NoTranscript {
            video_id: video_id.to_string(),
        });
    }
    let text = join_segments(segments);
    info!("Transcript for {}: {} chars", video_id, text.len());
    Ok(text)
}

/// Resolve the video ID in `url` and fetch its transcript.
pub async fn transcript_for_url(
    source: &dyn TranscriptSource,
    url: &str,
) -> Result<String, DocmindError> {
    let video_id = extract_video_id(url).ok_or_else(|| DocmindError::VideoIdNotFound {
        url: url.to_string(),
    })?;
    fetch_transcript(source, &video_id).await
}

// ── YouTube ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    /// `"asr"` for auto-generated tracks.
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Caption tracks fetched from youtube.com.
pub struct YouTubeTranscripts {
    client: reqwest::Client,
    languages: Vec<String>,
}

impl YouTubeTranscripts {
    pub fn new(timeout: Duration, languages: Vec<String>) -> Result<Self, DocmindError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("docmind/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DocmindError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client, languages })
    }

    pub fn from_config(config: &DocmindConfig) -> Result<Self, DocmindError> {
        Self::new(
            Duration::from_secs(config.transcript_timeout_secs),
            config.transcript_languages.clone(),
        )
    }

    async fn get_text(&self, video_id: &str, url: &str) -> Result<String, DocmindError> {
        let fail = |detail: String| DocmindError::TranscriptFetchFailed {
            video_id: video_id.to_string(),
            detail,
        };
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.8")
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fail(format!("HTTP {}", response.status())));
        }
        response.text().await.map_err(|e| fail(e.to_string()))
    }
}

#[async_trait]
impl TranscriptSource for YouTubeTranscripts {
    async fn segments(&self, video_id: &str) -> Result<Vec<TranscriptSegment>, DocmindError> {
        let page = self
            .get_text(video_id, &format!("{WATCH_URL}{video_id}"))
            .await?;

        let tracks = parse_caption_tracks(&page).map_err(|detail| {
            DocmindError::TranscriptFetchFailed {
                video_id: video_id.to_string(),
                detail,
            }
        })?;
        let track = choose_track(&tracks, &self.languages).ok_or_else(|| {
            DocmindError::NoTranscript {
                video_id: video_id.to_string(),
            }
        })?;
        debug!(
            "Using {} caption track '{}' for {}",
            if track.is_generated() { "generated" } else { "manual" },
            track.language_code,
            video_id
        );

        let xml = self.get_text(video_id, &track.base_url).await?;
        parse_timedtext(&xml).map_err(|detail| DocmindError::TranscriptFetchFailed {
            video_id: video_id.to_string(),
            detail,
        })
    }
}

/// The `captionTracks` array from a watch page; empty when the video has none.
fn parse_caption_tracks(page: &str) -> Result<Vec<CaptionTrack>, String> {
    let Some(idx) = page.find(CAPTION_MARKER) else {
        return Ok(Vec::new());
    };
    let rest = &page[idx + CAPTION_MARKER.len()..];
    match serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
    {
        Some(Ok(tracks)) => Ok(tracks),
        Some(Err(e)) => Err(format!("unreadable caption track list: {e}")),
        None => Err("caption track list is truncated".to_string()),
    }
}

/// Manual track in a preferred language, then a generated one, then anything.
fn choose_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    let lang_matches = |t: &CaptionTrack, lang: &str| {
        t.language_code == lang || t.language_code.split('-').next() == Some(lang)
    };
    for generated in [false, true] {
        for lang in languages {
            if let Some(t) = tracks
                .iter()
                .find(|t| t.is_generated() == generated && lang_matches(t, lang))
            {
                return Some(t);
            }
        }
    }
    tracks.first()
}

/// Segments from a timed-text XML document.
///
/// Self-closing elements become empty segments so neighbouring fragments
/// keep their own timing.
fn parse_timedtext(xml: &str) -> Result<Vec<TranscriptSegment>, String> {
    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<TranscriptSegment> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if let Some(segment) = segment_start(&e) {
                    current = Some(segment);
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(segment) = segment_start(&e) {
                    segments.push(segment);
                } else if e.local_name().as_ref() == b"br" {
                    if let Some(segment) = current.as_mut() {
                        segment.text.push(' ');
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(segment) = current.as_mut() {
                    match e.unescape() {
                        Ok(text) => segment.text.push_str(&text),
                        Err(_) => segment.text.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(segment) = current.as_mut() {
                    segment.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(e)) => {
                if is_segment(e.local_name().as_ref()) {
                    if let Some(mut segment) = current.take() {
                        segment.text = clean_fragment(&segment.text);
                        segments.push(segment);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "unreadable timed text at byte {}: {e}",
                    reader.buffer_position()
                ))
            }
            _ => {}
        }
    }
    Ok(segments)
}

fn is_segment(name: &[u8]) -> bool {
    matches!(name, b"text" | b"p")
}

/// A new, empty segment if `e` opens one. srv3 times are in milliseconds.
fn segment_start(e: &BytesStart<'_>) -> Option<TranscriptSegment> {
    let (start_attr, dur_attr, scale): (&[u8], &[u8], f64) = match e.local_name().as_ref() {
        b"text" => (&b"start"[..], &b"dur"[..], 1.0),
        b"p" => (&b"t"[..], &b"d"[..], 1000.0),
        _ => return None,
    };
    let number = |name: &[u8]| -> f64 {
        e.try_get_attribute(name)
            .ok()
            .flatten()
            .and_then(|a| a.unescape_value().ok()?.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    Some(TranscriptSegment {
        start: number(start_attr) / scale,
        duration: number(dur_attr) / scale,
        text: String::new(),
    })
}

/// Second unescape pass (YouTube escapes fragment text twice), then strip
/// inline markup and fold newlines.
fn clean_fragment(raw: &str) -> String {
    let text = unescape_with(raw, |entity| match entity {
        "nbsp" => Some(" "),
        other => resolve_predefined_entity(other),
    })
    .unwrap_or(Cow::Borrowed(raw));
    TAG_RE.replace_all(&text, "").replace('\n', " ")
}
