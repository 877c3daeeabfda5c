use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "vid2recipe",
    about = "vid2recipe - Turn cooking video URLs into structured recipes",
    version,
    long_about = "Extracts structured recipes from cooking videos: fetches the video's transcript from YouTube and uses Gemini to pull out the title, ingredients, and numbered instructions. Runs as an HTTP service or as a one-shot CLI."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP extraction service
    Serve {
        /// Address to bind (overrides config)
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Extract a recipe from a video URL and print it as JSON
    Extract {
        /// Cooking video URL (youtube.com or youtu.be)
        #[arg(value_name = "URL")]
        url: String,

        /// Output language for the recipe
        #[arg(short, long, default_value = "en", value_name = "LOCALE")]
        locale: String,

        /// Gemini API key (falls back to config, then GEMINI_API_KEY)
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show or initialize configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}
