use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vid2recipe::cli::{Cli, Commands};
use vid2recipe::config::Config;
use vid2recipe::pipeline::{ExtractionRequest, Pipeline, PipelineError};
use vid2recipe::server::{self, AppContext};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "vid2recipe=debug"
    } else {
        "vid2recipe=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load().await?;

    match cli.command {
        Commands::Serve { bind, port } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let addr = config.server.socket_addr()?;
            let pipeline = Pipeline::from_config(&config)?;

            tracing::info!(model = %config.ai.model, "starting extraction service");
            server::run(
                AppContext {
                    pipeline: Arc::new(pipeline),
                },
                addr,
            )
            .await?;
        }
        Commands::Extract {
            url,
            locale,
            api_key,
            output,
        } => {
            let pipeline = Pipeline::from_config(&config)?;

            let progress = ProgressBar::new_spinner();
            progress.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap(),
            );
            progress.set_message("Fetching transcript and extracting recipe...");
            progress.enable_steady_tick(std::time::Duration::from_millis(100));

            let result = pipeline
                .run(ExtractionRequest {
                    url,
                    locale: Some(locale),
                    api_key,
                })
                .await;

            match result {
                Ok(recipe) => {
                    progress.finish_with_message("Extraction complete");
                    let json = serde_json::to_string_pretty(&recipe)?;
                    match output {
                        Some(path) => {
                            fs_err::write(&path, json)?;
                            println!("Recipe saved to: {}", path.display());
                        }
                        None => println!("{}", json),
                    }
                }
                Err(PipelineError::BadRequest(message))
                | Err(PipelineError::ServerError(message)) => {
                    progress.finish_and_clear();
                    anyhow::bail!(message);
                }
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Edit the config file directly; it is created with defaults on first run.");
                config.save().await?;
            }
        }
    }

    Ok(())
}
