//! Configuration management for IARA.
//!
//! Loads configuration from ${IARA_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the SeShat API.
    pub api_base_url: String,
    /// Questions requested per batch.
    pub question_count: u32,
    /// Seconds of idleness before the hint offer surfaces.
    pub hint_offer_secs: u64,
    /// Milliseconds the hint offer takes to fade out once dismissed.
    pub hint_fade_ms: u64,
    /// Milliseconds before the simulated free-text acknowledgement.
    pub echo_delay_ms: u64,
    /// Milliseconds between a verdict message and the next question.
    pub advance_delay_ms: u64,
    /// Subjects offered when `GET /materias` is unreachable.
    pub fallback_subjects: Vec<String>,
}

impl Config {
    pub const DEFAULT_API_BASE_URL: &'static str = "https://seshat-api-m30w.onrender.com";

    /// Loads configuration from the default path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the API base URL with precedence: env > config.
    ///
    /// # Errors
    /// Returns an error if the resolved URL is not well-formed.
    pub fn resolve_api_base_url(&self) -> Result<String> {
        let raw = match std::env::var("IARA_API_URL") {
            Ok(env_url) if !env_url.trim().is_empty() => env_url.trim().to_string(),
            _ => self.api_base_url.clone(),
        };
        url::Url::parse(&raw).with_context(|| format!("Invalid API base URL: {raw}"))?;
        Ok(raw.trim_end_matches('/').to_string())
    }

    pub fn hint_offer_delay(&self) -> Duration {
        Duration::from_secs(self.hint_offer_secs)
    }

    pub fn hint_fade_delay(&self) -> Duration {
        Duration::from_millis(self.hint_fade_ms)
    }

    pub fn echo_delay(&self) -> Duration {
        Duration::from_millis(self.echo_delay_ms)
    }

    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            question_count: 10,
            hint_offer_secs: 30,
            hint_fade_ms: 300,
            echo_delay_ms: 1200,
            advance_delay_ms: 1500,
            fallback_subjects: vec![
                "Matemática".to_string(),
                "Português".to_string(),
                "História".to_string(),
                "Redação".to_string(),
                "Física".to_string(),
            ],
        }
    }
}

pub mod paths {
    //! Path resolution for IARA configuration and data directories.
    //!
    //! IARA_HOME resolution order:
    //! 1. IARA_HOME environment variable (if set)
    //! 2. ~/.config/iara (default)

    use std::path::PathBuf;

    /// Returns the IARA home directory.
    ///
    /// Checks IARA_HOME env var first, falls back to ~/.config/iara
    pub fn iara_home() -> PathBuf {
        if let Ok(home) = std::env::var("IARA_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("iara"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        iara_home().join("config.toml")
    }

    /// Returns the path to the stored bearer token.
    pub fn token_path() -> PathBuf {
        iara_home().join("token")
    }

    /// Returns the directory used for log files.
    pub fn logs_dir() -> PathBuf {
        iara_home().join("logs")
    }
}
