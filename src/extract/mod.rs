//! AI-backed recipe extraction: prompt construction, credential resolution,
//! one model call per attempt, and schema validation of the output.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::AiConfig;
use crate::recipe::Locale;
use crate::transcript::Transcript;
use crate::utils::truncate_for_log;

pub mod gemini;
pub mod parser;

pub use gemini::GeminiClient;
pub use parser::RecipeDraft;

/// Errors raised while extracting a recipe from a transcript
#[derive(Debug, thiserror::Error)]
pub enum AiProcessingError {
    #[error("No Gemini API key was provided or configured.")]
    MissingCredential,

    #[error("Model request failed: {0}")]
    Upstream(String),

    #[error("The model returned no content.")]
    EmptyResponse,

    /// The raw model text is kept for server-side diagnostics only; the
    /// Display form carries just the schema detail.
    #[error("Model output did not match the recipe schema: {detail}")]
    SchemaViolation { detail: String, raw: String },
}

/// Seam over the generative model so extraction is testable offline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Run one text-completion call and return the raw model text.
    async fn generate(&self, prompt: &str, api_key: &str) -> Result<String, AiProcessingError>;
}

/// Where the credential used for a call came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Supplied by the caller on this request
    Provided(String),
    /// Process-wide configured key
    Configured(String),
}

impl Credential {
    pub fn secret(&self) -> &str {
        match self {
            Credential::Provided(key) | Credential::Configured(key) => key,
        }
    }

    pub fn source_name(&self) -> &'static str {
        match self {
            Credential::Provided(_) => "caller",
            Credential::Configured(_) => "config",
        }
    }
}

/// Resolve the credential for one call: the caller's key wins, the configured
/// key is the fallback, and neither means the call cannot proceed.
pub fn resolve_credential(
    caller: Option<&str>,
    configured: Option<&str>,
) -> Result<Credential, AiProcessingError> {
    if let Some(key) = caller.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(Credential::Provided(key.to_string()));
    }
    if let Some(key) = configured.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(Credential::Configured(key.to_string()));
    }
    Err(AiProcessingError::MissingCredential)
}

/// Recipe extraction engine
pub struct ExtractionEngine {
    model: Arc<dyn GenerativeModel>,
    config: AiConfig,
}

impl ExtractionEngine {
    pub fn new(model: Arc<dyn GenerativeModel>, config: AiConfig) -> Self {
        Self { model, config }
    }

    /// Extract a recipe draft from a transcript. The source URL is attached
    /// later by the pipeline, not here.
    pub async fn extract(
        &self,
        transcript: &Transcript,
        locale: Locale,
        video_title: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<RecipeDraft, AiProcessingError> {
        let credential =
            resolve_credential(api_key, self.config.resolved_api_key().as_deref())?;
        tracing::debug!(source = credential.source_name(), "resolved Gemini credential");

        let prompt = build_prompt(transcript, locale, video_title);
        let raw = self.model.generate(&prompt, credential.secret()).await?;

        match parser::parse_recipe(&raw) {
            Ok(draft) => Ok(draft),
            Err(error) => {
                if let AiProcessingError::SchemaViolation { detail, raw } = &error {
                    tracing::warn!(
                        detail = %detail,
                        raw_output = %truncate_for_log(raw, 2000),
                        "model output failed schema validation"
                    );
                }
                Err(error)
            }
        }
    }
}

/// Build the extraction prompt. Deterministic given identical inputs, so
/// engine behavior is testable independent of model nondeterminism.
pub(crate) fn build_prompt(
    transcript: &Transcript,
    locale: Locale,
    video_title: Option<&str>,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are a recipe extraction assistant. From the cooking video transcript below, \
         extract a single recipe. Respond with only a JSON object: no prose, no code fences.\n\n",
    );
    prompt.push_str("The JSON object must use these fields:\n");
    prompt.push_str("- title: string, required\n");
    prompt.push_str("- description: string, optional\n");
    prompt.push_str(
        "- prepTime, cookTime, totalTime: optional human-readable durations, e.g. \"25 minutes\"\n",
    );
    prompt.push_str("- servings: string, optional\n");
    prompt.push_str(
        "- ingredients: array of { name, quantity, unit, preparation }, in recipe order; \
         name is required\n",
    );
    prompt.push_str("- instructions: array of { step, description }, numbered from 1\n");
    prompt.push_str(&format!(
        "\nWrite every natural-language value in {}.\n",
        locale.language_name()
    ));
    if let Some(title) = video_title {
        prompt.push_str(&format!("\nVideo title: {}\n", title));
    }
    prompt.push_str("\nTranscript:\n");
    prompt.push_str(&transcript.full_text());
    prompt
}
