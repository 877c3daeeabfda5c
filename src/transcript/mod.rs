//! Transcript retrieval: video identification and the caption-source seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::recipe::Locale;

pub mod innertube;

pub use innertube::{InnerTubeClient, TrackPreference};

/// Errors raised while resolving a video and retrieving its transcript
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("Invalid YouTube URL provided: {0}")]
    InvalidUrl(String),

    #[error("Video not found or not accessible: {0}")]
    NotFound(String),

    #[error("No captions are available for this video.")]
    Unavailable,

    #[error("Transcript retrieval failed: {0}")]
    Upstream(String),
}

/// One timed caption segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Offset from the start of the video in milliseconds
    pub start_ms: u64,

    /// Display duration in milliseconds
    pub duration_ms: u64,

    /// Segment text
    pub text: String,
}

/// A retrieved transcript, tagged with the language it was served in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Segments in playback order
    pub segments: Vec<TranscriptSegment>,

    /// BCP-47 language code of the selected caption track
    pub language: String,

    /// True when the track was auto-generated (ASR) rather than hand-written
    pub auto_generated: bool,
}

impl Transcript {
    /// Flatten the segments into the plain text handed to the extraction prompt.
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// YouTube video identifier derived from a user-supplied URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a video ID from any known YouTube URL shape.
    ///
    /// Recognized shapes: `watch?v=<id>`, `youtu.be/<id>`, `/shorts/<id>`,
    /// `/embed/<id>`, `/live/<id>`, `/v/<id>`. Anything else fails explicitly.
    pub fn from_url(raw: &str) -> Result<Self, TranscriptError> {
        let parsed =
            Url::parse(raw).map_err(|_| TranscriptError::InvalidUrl(raw.to_string()))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TranscriptError::InvalidUrl(raw.to_string()));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| TranscriptError::InvalidUrl(raw.to_string()))?;

        if !is_youtube_host(host) {
            return Err(TranscriptError::InvalidUrl(raw.to_string()));
        }

        // youtu.be/<id>
        if host.eq_ignore_ascii_case("youtu.be") {
            if let Some(seg) = parsed.path_segments().and_then(|mut s| s.next()) {
                let seg = seg.trim();
                if !seg.is_empty() {
                    return Ok(VideoId(seg.to_string()));
                }
            }
            return Err(TranscriptError::InvalidUrl(raw.to_string()));
        }

        // youtube.com/watch?v=<id>
        if parsed.path().starts_with("/watch") {
            for (k, v) in parsed.query_pairs() {
                if k == "v" {
                    let v = v.trim();
                    if !v.is_empty() {
                        return Ok(VideoId(v.to_string()));
                    }
                }
            }
            return Err(TranscriptError::InvalidUrl(raw.to_string()));
        }

        // youtube.com/shorts/<id>, /embed/<id>, /live/<id>, /v/<id>
        if let Some(mut segs) = parsed.path_segments() {
            let a = segs.next().unwrap_or("");
            let b = segs.next().unwrap_or("").trim();
            if matches!(a, "shorts" | "embed" | "live" | "v") && !b.is_empty() {
                return Ok(VideoId(b.to_string()));
            }
        }

        Err(TranscriptError::InvalidUrl(raw.to_string()))
    }
}

fn is_youtube_host(host: &str) -> bool {
    let h = host.to_ascii_lowercase();
    h == "youtube.com" || h == "youtu.be" || h.ends_with(".youtube.com")
}

/// Capability seam over the caption-retrieval protocol.
///
/// The InnerTube details (token negotiation, track selection) live behind
/// this trait so the pipeline never sees them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch a transcript for a video, preferring captions in `locale`.
    async fn fetch_transcript(
        &self,
        video: &VideoId,
        locale: Locale,
    ) -> Result<Transcript, TranscriptError>;
}
