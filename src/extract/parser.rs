//! Pure coercion of raw model text into a validated recipe draft.
//!
//! Models wrap their payloads in prose or code fences often enough that this
//! has to be tolerant on the way in and strict on the way out: the JSON object
//! is isolated from surrounding noise, then required fields are enforced and
//! every string is normalized. No side effects, so it can be unit tested
//! against a corpus of recorded outputs.

use serde::{Deserialize, Serialize};

use super::AiProcessingError;
use crate::recipe::{Ingredient, InstructionStep, Recipe};
use crate::utils::collapse_whitespace;

/// Recipe as extracted by the model, before the source URL is attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub title: String,
    pub description: Option<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub total_time: Option<String>,
    pub servings: Option<String>,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<InstructionStep>,
    pub video_title: Option<String>,
}

impl RecipeDraft {
    /// Attach the source URL, yielding the finished recipe.
    pub fn into_recipe(self, source_url: String) -> Recipe {
        Recipe {
            title: self.title,
            description: self.description,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            total_time: self.total_time,
            servings: self.servings,
            ingredients: self.ingredients,
            instructions: self.instructions,
            video_title: self.video_title,
            source_url,
        }
    }
}

/// Parse raw model text into a validated, normalized recipe draft.
///
/// Normalization: instruction steps are renumbered to a contiguous 1..N
/// sequence in emitted order, whitespace is collapsed in every string field,
/// and ingredients without a name are dropped.
pub fn parse_recipe(raw: &str) -> Result<RecipeDraft, AiProcessingError> {
    let payload = isolate_json(raw)
        .ok_or_else(|| violation("no JSON object found in model output", raw))?;

    let parsed: RawRecipe = serde_json::from_str(payload)
        .map_err(|e| violation(&format!("invalid JSON: {}", e), raw))?;

    let title = parsed
        .title
        .as_deref()
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| violation("missing or empty \"title\"", raw))?;

    let ingredients: Vec<Ingredient> = parsed
        .ingredients
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw_ingredient| {
            let name = collapse_whitespace(raw_ingredient.name.as_deref()?);
            if name.is_empty() {
                return None;
            }
            Some(Ingredient {
                name,
                quantity: clean_scalar(raw_ingredient.quantity),
                unit: clean_optional(raw_ingredient.unit),
                preparation: clean_optional(raw_ingredient.preparation),
            })
        })
        .collect();
    if ingredients.is_empty() {
        return Err(violation("missing or empty \"ingredients\"", raw));
    }

    // model-emitted step numbers are ignored; positions are renumbered 1..N
    let instructions: Vec<InstructionStep> = parsed
        .instructions
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw_step| {
            let description = collapse_whitespace(raw_step.description.as_deref()?);
            if description.is_empty() {
                None
            } else {
                Some(description)
            }
        })
        .enumerate()
        .map(|(index, description)| InstructionStep {
            step: index as u32 + 1,
            description,
        })
        .collect();
    if instructions.is_empty() {
        return Err(violation("missing or empty \"instructions\"", raw));
    }

    Ok(RecipeDraft {
        title,
        description: clean_optional(parsed.description),
        prep_time: clean_scalar(parsed.prep_time),
        cook_time: clean_scalar(parsed.cook_time),
        total_time: clean_scalar(parsed.total_time),
        servings: clean_scalar(parsed.servings),
        ingredients,
        instructions,
        video_title: clean_optional(parsed.video_title),
    })
}

fn violation(detail: &str, raw: &str) -> AiProcessingError {
    AiProcessingError::SchemaViolation {
        detail: detail.to_string(),
        raw: raw.to_string(),
    }
}

/// Cut the JSON object out of surrounding prose or code fences.
fn isolate_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

fn clean_scalar(value: Option<Scalar>) -> Option<String> {
    value
        .map(Scalar::into_string)
        .map(|s| collapse_whitespace(&s))
        .filter(|s| !s.is_empty())
}

// --- tolerant wire types ----------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecipe {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    prep_time: Option<Scalar>,
    #[serde(default)]
    cook_time: Option<Scalar>,
    #[serde(default)]
    total_time: Option<Scalar>,
    #[serde(default)]
    servings: Option<Scalar>,
    #[serde(default)]
    ingredients: Option<Vec<RawIngredient>>,
    #[serde(default)]
    instructions: Option<Vec<RawStep>>,
    #[serde(default)]
    video_title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIngredient {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    quantity: Option<Scalar>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    preparation: Option<String>,
}

/// Emitted step numbers are not deserialized at all; order is positional.
#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(default)]
    description: Option<String>,
}

/// Models emit "4" and 4 interchangeably for amounts and servings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(f64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    format!("{}", n as i64)
                } else {
                    n.to_string()
                }
            }
        }
    }
}
