//! vid2recipe - turn a cooking video URL into a structured recipe
//!
//! This library fetches a video's spoken transcript over YouTube's internal
//! InnerTube API, hands it to Gemini with extraction instructions, and
//! validates the model output against a strict recipe schema. The result is
//! served over a small HTTP API or printed from the CLI.

pub mod cli;
pub mod config;
pub mod extract;
pub mod pipeline;
pub mod recipe;
pub mod server;
pub mod transcript;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use extract::{AiProcessingError, ExtractionEngine};
pub use pipeline::{ExtractionRequest, Pipeline, PipelineError};
pub use recipe::{Ingredient, InstructionStep, Locale, Recipe};
pub use transcript::{Transcript, TranscriptError, TranscriptSource, VideoId};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
