//! Extraction pipeline: validate the request, fetch the transcript, run the
//! extraction engine, attach the source URL, and classify failures.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;
use crate::extract::{ExtractionEngine, GeminiClient};
use crate::recipe::{Locale, Recipe};
use crate::transcript::{InnerTubeClient, TranscriptSource, VideoId};
use crate::utils::is_http_url;

/// Inbound extraction request, as posted by callers
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    /// Cooking video URL
    pub url: String,

    /// Output language, "en" or "ko"; defaults to "en"
    #[serde(default)]
    pub locale: Option<String>,

    /// Caller-supplied Gemini key, request-scoped only
    #[serde(default)]
    pub api_key: Option<String>,
}

// manual Debug so the credential never reaches a log line
impl fmt::Debug for ExtractionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionRequest")
            .field("url", &self.url)
            .field("locale", &self.locale)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Caller-facing failure classification
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The caller can fix this by supplying better input; maps to HTTP 400
    #[error("{0}")]
    BadRequest(String),

    /// Server-side failure; maps to HTTP 500
    #[error("{0}")]
    ServerError(String),
}

/// Sequences Transcript Client and Extraction Engine for one request
pub struct Pipeline {
    transcripts: Arc<dyn TranscriptSource>,
    engine: ExtractionEngine,
}

impl Pipeline {
    pub fn new(transcripts: Arc<dyn TranscriptSource>, engine: ExtractionEngine) -> Self {
        Self {
            transcripts,
            engine,
        }
    }

    /// Wire up the production collaborators from configuration.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let transcripts = InnerTubeClient::new(&config.transcript)?;
        let model = GeminiClient::new(
            &config.ai.model,
            Duration::from_secs(config.ai.request_timeout_secs),
        )?;
        Ok(Self::new(
            Arc::new(transcripts),
            ExtractionEngine::new(Arc::new(model), config.ai.clone()),
        ))
    }

    /// Run one extraction. Each stage executes exactly once; there are no
    /// retries anywhere, so transient upstream failures surface immediately.
    pub async fn run(&self, request: ExtractionRequest) -> Result<Recipe, PipelineError> {
        // Validating: the only validation gate, performed once. Nothing
        // downstream is invoked until the request shape is known good.
        let locale: Locale = match request.locale.as_deref() {
            None => Locale::default(),
            Some(raw) => raw.parse().map_err(PipelineError::BadRequest)?,
        };
        if !is_http_url(&request.url) {
            return Err(PipelineError::BadRequest(
                "Invalid YouTube URL provided.".to_string(),
            ));
        }

        // FetchingTranscript: URL-shape failures belong to this stage too,
        // since video-ID derivation is part of the transcript protocol.
        let transcript = match VideoId::from_url(&request.url) {
            Ok(video) => self.transcripts.fetch_transcript(&video, locale).await,
            Err(error) => Err(error),
        }
        .map_err(|error| {
            tracing::warn!(url = %request.url, error = %error, "transcript stage failed");
            PipelineError::BadRequest(format!("Transcript Error: {}", error))
        })?;

        tracing::info!(
            segments = transcript.segments.len(),
            language = %transcript.language,
            "transcript retrieved"
        );

        // Extracting: the engine never sees request-level concerns beyond
        // the locale and the optional caller credential.
        let draft = self
            .engine
            .extract(&transcript, locale, None, request.api_key.as_deref())
            .await
            .map_err(|error| {
                tracing::error!(error = %error, "ai stage failed");
                PipelineError::ServerError(format!("AI Processing Error: {}", error))
            })?;

        // Composing: the source URL is attached verbatim, never normalized.
        Ok(draft.into_recipe(request.url))
    }
}
