//! Recipe data model and the supported output locales.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language the extracted recipe should be written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ko,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ko => "ko",
        }
    }

    /// Language name as spelled out inside the extraction prompt.
    pub fn language_name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Ko => "Korean",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Locale::En),
            "ko" => Ok(Locale::Ko),
            other => Err(format!(
                "Unsupported locale \"{}\" (expected \"en\" or \"ko\").",
                other
            )),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single recipe ingredient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    /// Ingredient name (never empty)
    pub name: String,

    /// Amount, kept as free text ("2", "1/2", "a pinch")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,

    /// Unit of measure ("cups", "g", "tbsp")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Prep note ("finely chopped", "room temperature")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preparation: Option<String>,
}

/// Single numbered instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionStep {
    /// Position in the recipe, contiguous from 1
    pub step: u32,

    /// What to do at this step (never empty)
    pub description: String,
}

/// The finished recipe returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Human-readable durations ("25 minutes"), as spoken in the video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<String>,

    /// Ingredients in recipe order, not alphabetical
    pub ingredients: Vec<Ingredient>,

    /// Steps numbered contiguously from 1
    pub instructions: Vec<InstructionStep>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,

    /// The URL the caller submitted, attached verbatim by the pipeline
    pub source_url: String,
}
