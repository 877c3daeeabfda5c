use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::transcript::innertube::{default_track_preferences, TrackPreference};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Gemini settings
    pub ai: AiConfig,

    /// Transcript retrieval settings
    pub transcript: TranscriptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    pub bind: String,

    /// Port to listen on
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Gemini model identifier
    pub model: String,

    /// Process-wide API key; falls back to the GEMINI_API_KEY environment
    /// variable when unset. Callers may still supply their own per request.
    pub api_key: Option<String>,

    /// Upper bound on a single model call
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Caption-track fallback order, tried until one matches
    pub track_preferences: Vec<TrackPreference>,

    /// Upper bound on each transcript-protocol call
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1".to_string(),
                port: 8080,
            },
            ai: AiConfig {
                model: "gemini-2.0-flash".to_string(),
                api_key: None,
                request_timeout_secs: 60,
            },
            transcript: TranscriptConfig {
                track_preferences: default_track_preferences(),
                request_timeout_secs: 20,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content =
                fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            let config: Config =
                serde_yaml::from_str(&content).context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("vid2recipe").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.ai.model.is_empty() {
            anyhow::bail!("AI model must be configured");
        }

        if self.transcript.track_preferences.is_empty() {
            anyhow::bail!("At least one caption-track preference must be configured");
        }

        if self.ai.request_timeout_secs == 0 || self.transcript.request_timeout_secs == 0 {
            anyhow::bail!("Request timeouts must be non-zero");
        }

        Ok(())
    }

    /// Display current configuration (the API key is never printed)
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Bind Address: {}:{}", self.server.bind, self.server.port);
        println!("  Gemini Model: {}", self.ai.model);
        let key_state = if self.ai.resolved_api_key().is_some() {
            "configured"
        } else {
            "not configured"
        };
        println!("  Gemini API Key: {}", key_state);
        println!("  Model Timeout: {}s", self.ai.request_timeout_secs);
        println!(
            "  Transcript Timeout: {}s",
            self.transcript.request_timeout_secs
        );
        print!("  Caption Fallback:");
        for preference in &self.transcript.track_preferences {
            print!(" {:?}", preference);
        }
        println!();
    }
}

impl ServerConfig {
    /// Resolve the configured bind address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address: {}:{}", self.bind, self.port))
    }
}

impl AiConfig {
    /// The process-wide credential: config file value first, then environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                std::env::var("GEMINI_API_KEY")
                    .ok()
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.transcript.track_preferences.len(), 4);
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        let addr = config.server.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);

        let bad = ServerConfig {
            bind: "not an address".to_string(),
            port: 8080,
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_configured_api_key_wins() {
        let ai = AiConfig {
            model: "gemini-2.0-flash".to_string(),
            api_key: Some("from-config".to_string()),
            request_timeout_secs: 60,
        };
        assert_eq!(ai.resolved_api_key().as_deref(), Some("from-config"));
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let ai = AiConfig {
            model: "gemini-2.0-flash".to_string(),
            api_key: Some("   ".to_string()),
            request_timeout_secs: 60,
        };
        // falls through to the environment, which may or may not be set;
        // either way the blank config value must not be returned
        assert_ne!(ai.resolved_api_key().as_deref(), Some("   "));
    }

    #[test]
    fn test_config_round_trips_through_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(
            parsed.transcript.track_preferences,
            config.transcript.track_preferences
        );
        assert_eq!(parsed.ai.model, config.ai.model);
    }
}
