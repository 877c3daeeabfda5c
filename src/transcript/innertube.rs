//! Caption retrieval over YouTube's internal InnerTube player API.
//!
//! The protocol is undocumented and versioned by YouTube. Everything that may
//! need bumping when the upstream moves (endpoint, client identity) lives in
//! the constants at the top of this file.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Transcript, TranscriptError, TranscriptSegment, TranscriptSource, VideoId};
use crate::config::TranscriptConfig;
use crate::recipe::Locale;
use crate::utils::collapse_whitespace;

const PLAYER_ENDPOINT: &str = "https://www.youtube.com/youtubei/v1/player";
const CLIENT_NAME: &str = "WEB";
const CLIENT_VERSION: &str = "2.20250301.00.00";

/// Caption-track selection preference, tried in order until one matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackPreference {
    /// Hand-written track in the requested locale
    PreferredManual,
    /// Auto-generated track in the requested locale
    PreferredAuto,
    /// Auto-generated track in any language
    AnyAuto,
    /// First track the platform lists
    Any,
}

/// Default fallback order: requested-locale track, then auto-generated,
/// then whatever is available.
pub fn default_track_preferences() -> Vec<TrackPreference> {
    vec![
        TrackPreference::PreferredManual,
        TrackPreference::PreferredAuto,
        TrackPreference::AnyAuto,
        TrackPreference::Any,
    ]
}

/// Transcript client speaking the InnerTube protocol
pub struct InnerTubeClient {
    http: reqwest::Client,
    preferences: Vec<TrackPreference>,
}

impl InnerTubeClient {
    pub fn new(config: &TranscriptConfig) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            preferences: config.track_preferences.clone(),
        })
    }

    /// Call the player endpoint for video metadata and caption-track listing.
    async fn fetch_player(
        &self,
        video: &VideoId,
        locale: Locale,
    ) -> Result<PlayerResponse, TranscriptError> {
        let body = PlayerRequest {
            context: Context {
                client: ClientInfo {
                    client_name: CLIENT_NAME,
                    client_version: CLIENT_VERSION,
                    hl: locale.as_str(),
                },
            },
            video_id: video.as_str(),
        };

        let response = self
            .http
            .post(PLAYER_ENDPOINT)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranscriptError::Upstream("player request timed out".to_string())
                } else {
                    TranscriptError::Upstream(format!("player request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptError::Upstream(format!(
                "player endpoint returned HTTP {}",
                status
            )));
        }

        response
            .json::<PlayerResponse>()
            .await
            .map_err(|e| TranscriptError::Upstream(format!("malformed player response: {}", e)))
    }

    /// Fetch and flatten the timed text for a selected caption track.
    async fn fetch_timed_text(
        &self,
        base_url: &str,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        let url = format!("{}&fmt=json3", base_url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                TranscriptError::Upstream("timed text request timed out".to_string())
            } else {
                TranscriptError::Upstream(format!("timed text request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptError::Upstream(format!(
                "timed text endpoint returned HTTP {}",
                status
            )));
        }

        let body = response
            .json::<TimedText>()
            .await
            .map_err(|e| TranscriptError::Upstream(format!("malformed timed text: {}", e)))?;

        Ok(segments_from_events(body))
    }
}

#[async_trait]
impl TranscriptSource for InnerTubeClient {
    async fn fetch_transcript(
        &self,
        video: &VideoId,
        locale: Locale,
    ) -> Result<Transcript, TranscriptError> {
        tracing::debug!(video = video.as_str(), locale = %locale, "requesting player metadata");
        let player = self.fetch_player(video, locale).await?;

        if let Some(playability) = player.playability_status {
            match playability.status.as_deref() {
                None | Some("OK") => {}
                Some(other) => {
                    let reason = playability
                        .reason
                        .unwrap_or_else(|| format!("video is not playable ({})", other));
                    return Err(TranscriptError::NotFound(reason));
                }
            }
        }

        let tracks = player
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .map(|r| r.caption_tracks)
            .unwrap_or_default();

        let track = select_track(&tracks, locale, &self.preferences)
            .ok_or(TranscriptError::Unavailable)?;

        tracing::debug!(
            language = %track.language_code,
            auto_generated = track.is_auto_generated(),
            "selected caption track"
        );

        let segments = self.fetch_timed_text(&track.base_url).await?;
        if segments.is_empty() {
            // a track that serves no text counts as no transcript
            return Err(TranscriptError::Unavailable);
        }

        Ok(Transcript {
            segments,
            language: track.language_code.clone(),
            auto_generated: track.is_auto_generated(),
        })
    }
}

/// Pick a caption track by walking the preference list in order.
fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    locale: Locale,
    preferences: &[TrackPreference],
) -> Option<&'a CaptionTrack> {
    let wanted = locale.as_str();
    for preference in preferences {
        let found = match preference {
            TrackPreference::PreferredManual => tracks
                .iter()
                .find(|t| matches_language(&t.language_code, wanted) && !t.is_auto_generated()),
            TrackPreference::PreferredAuto => tracks
                .iter()
                .find(|t| matches_language(&t.language_code, wanted) && t.is_auto_generated()),
            TrackPreference::AnyAuto => tracks.iter().find(|t| t.is_auto_generated()),
            TrackPreference::Any => tracks.first(),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// "en" matches "en" and regional variants like "en-US"
fn matches_language(track_code: &str, wanted: &str) -> bool {
    let track_code = track_code.to_ascii_lowercase();
    track_code == wanted || track_code.starts_with(&format!("{}-", wanted))
}

/// Flatten json3 events into ordered segments, skipping empty ones.
fn segments_from_events(body: TimedText) -> Vec<TranscriptSegment> {
    body.events
        .into_iter()
        .filter_map(|event| {
            let text: String = event
                .segs?
                .into_iter()
                .filter_map(|seg| seg.utf8)
                .collect::<Vec<_>>()
                .join("");
            let text = collapse_whitespace(&text);
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment {
                start_ms: event.t_start_ms.unwrap_or(0),
                duration_ms: event.d_duration_ms.unwrap_or(0),
                text,
            })
        })
        .collect()
}

// --- wire types -------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerRequest<'a> {
    context: Context<'a>,
    video_id: &'a str,
}

#[derive(Serialize)]
struct Context<'a> {
    client: ClientInfo<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo<'a> {
    client_name: &'static str,
    client_version: &'static str,
    hl: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    #[serde(default)]
    playability_status: Option<PlayabilityStatus>,
    #[serde(default)]
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayabilityStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    #[serde(default)]
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    /// "asr" marks an auto-generated track
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedEvent {
    #[serde(rename = "tStartMs")]
    t_start_ms: Option<u64>,
    #[serde(rename = "dDurationMs")]
    d_duration_ms: Option<u64>,
    segs: Option<Vec<TextSegment>>,
}

#[derive(Debug, Deserialize)]
struct TextSegment {
    utf8: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(language: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://example.com/timedtext?lang={}", language),
            language_code: language.to_string(),
            kind: kind.map(|k| k.to_string()),
        }
    }

    #[test]
    fn test_select_track_prefers_manual_in_locale() {
        let tracks = vec![
            track("en", Some("asr")),
            track("ko", None),
            track("en", None),
        ];
        let selected =
            select_track(&tracks, Locale::En, &default_track_preferences()).unwrap();
        assert_eq!(selected.language_code, "en");
        assert!(!selected.is_auto_generated());
    }

    #[test]
    fn test_select_track_falls_back_to_auto_in_locale() {
        let tracks = vec![track("ko", None), track("en", Some("asr"))];
        let selected =
            select_track(&tracks, Locale::En, &default_track_preferences()).unwrap();
        assert_eq!(selected.language_code, "en");
        assert!(selected.is_auto_generated());
    }

    #[test]
    fn test_select_track_falls_back_to_any_auto_then_any() {
        let tracks = vec![track("ja", None), track("de", Some("asr"))];
        let selected =
            select_track(&tracks, Locale::Ko, &default_track_preferences()).unwrap();
        assert_eq!(selected.language_code, "de");

        let tracks = vec![track("ja", None)];
        let selected =
            select_track(&tracks, Locale::Ko, &default_track_preferences()).unwrap();
        assert_eq!(selected.language_code, "ja");
    }

    #[test]
    fn test_select_track_matches_regional_variants() {
        let tracks = vec![track("en-US", None)];
        let selected =
            select_track(&tracks, Locale::En, &default_track_preferences()).unwrap();
        assert_eq!(selected.language_code, "en-US");
    }

    #[test]
    fn test_select_track_empty_list() {
        assert!(select_track(&[], Locale::En, &default_track_preferences()).is_none());
    }

    #[test]
    fn test_select_track_honors_custom_order() {
        // a policy that only accepts the requested locale
        let tracks = vec![track("ja", None)];
        let only_preferred = vec![TrackPreference::PreferredManual, TrackPreference::PreferredAuto];
        assert!(select_track(&tracks, Locale::En, &only_preferred).is_none());
    }

    #[test]
    fn test_segments_from_events() {
        let body: TimedText = serde_json::from_str(
            r#"{
                "events": [
                    {"tStartMs": 0, "dDurationMs": 1200, "segs": [{"utf8": "hello "}, {"utf8": "there"}]},
                    {"tStartMs": 1200, "dDurationMs": 800},
                    {"tStartMs": 2000, "dDurationMs": 500, "segs": [{"utf8": "\n"}]},
                    {"tStartMs": 2500, "dDurationMs": 900, "segs": [{"utf8": "chop  the   onions"}]}
                ]
            }"#,
        )
        .unwrap();

        let segments = segments_from_events(body);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello there");
        assert_eq!(segments[0].start_ms, 0);
        assert_eq!(segments[1].text, "chop the onions");
        assert_eq!(segments[1].duration_ms, 900);
    }

    #[test]
    fn test_player_response_without_captions() {
        let response: PlayerResponse = serde_json::from_str(
            r#"{"playabilityStatus": {"status": "OK"}, "videoDetails": {"title": "x"}}"#,
        )
        .unwrap();
        assert!(response.captions.is_none());
    }

    #[test]
    fn test_player_response_error_status() {
        let response: PlayerResponse = serde_json::from_str(
            r#"{"playabilityStatus": {"status": "ERROR", "reason": "This video is unavailable"}}"#,
        )
        .unwrap();
        let playability = response.playability_status.unwrap();
        assert_eq!(playability.status.as_deref(), Some("ERROR"));
        assert_eq!(
            playability.reason.as_deref(),
            Some("This video is unavailable")
        );
    }
}
