//! Configuration management for Ferret
//!
//! Supports environment variables, config files, and runtime overrides.
//! The resulting value is handed to every component at construction.
//!
//! Config file location: ~/.config/ferret/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{FerretError, Result};

/// Main configuration for Ferret
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream API configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Model configuration
    #[serde(default)]
    pub models: ModelConfig,
    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// Search tool configuration
    #[serde(default)]
    pub search: SearchConfig,
    /// Conversation storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Upstream endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL shared by the chat and search endpoints
    pub base_url: String,
    /// Bearer token; read from `AI_BUILDER_TOKEN`, never written to disk
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    /// Timeout for a single model call in seconds
    pub chat_timeout_secs: u64,
    /// Timeout for a single search call in seconds
    pub search_timeout_secs: u64,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model used when the caller does not name one
    /// Default: gpt-5
    pub default: String,
    /// Sampling temperature for models that accept one
    /// Default: 0.7
    pub temperature: f32,
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Tool-use rounds allowed before a tool-free answer is forced
    /// Default: 3
    pub max_tool_rounds: usize,
    /// Optional system prompt placed before the conversation
    pub system_prompt: Option<String>,
    /// Whether to show debug output
    pub debug: bool,
}

/// Search tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Results requested when the model does not say
    pub default_max_results: u32,
    /// Upper bound on requested results
    pub max_results_cap: u32,
    /// Entries rendered into the tool result
    pub result_limit: usize,
    /// Characters of each entry's content kept before truncation
    pub snippet_chars: usize,
}

/// Conversation storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `index.json` and one file per conversation
    pub history_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("FERRET_BASE_URL")
                .unwrap_or_else(|_| "https://space.ai-builders.com/backend/v1".to_string()),
            token: token_from_env(),
            chat_timeout_secs: 120,
            search_timeout_secs: 30,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default: env::var("FERRET_MODEL").unwrap_or_else(|_| "gpt-5".to_string()),
            temperature: 0.7,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 3,
            system_prompt: None,
            debug: env::var("FERRET_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_max_results: 6,
            max_results_cap: 20,
            result_limit: 5,
            snippet_chars: 300,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let history_dir = env::var("FERRET_HISTORY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("ferret")
                    .join("chats")
            });
        Self { history_dir }
    }
}

fn token_from_env() -> Option<String> {
    env::var("AI_BUILDER_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ferret")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let config_path = Self::config_file();
        let mut config = if config_path.exists() {
            match Self::load_from_file() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(
                        path = %config_path.display(),
                        error = %e,
                        "Ignoring unreadable config file"
                    );
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.apply_env(|key| env::var(key).ok());
        config
    }

    /// Overlay environment settings on top of file values
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = var("FERRET_BASE_URL") {
            self.api.base_url = base_url;
        }
        if let Some(token) = var("AI_BUILDER_TOKEN") {
            self.api.token = Some(token);
        }
        if let Some(model) = var("FERRET_MODEL") {
            self.models.default = model;
        }
        if let Some(dir) = var("FERRET_HISTORY_DIR") {
            self.storage.history_dir = PathBuf::from(dir);
        }
        if let Some(debug) = var("FERRET_DEBUG") {
            self.agent.debug = debug == "true" || debug == "1";
        }
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(FerretError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| FerretError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| FerretError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| FerretError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| FerretError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| FerretError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }

    /// The API token, or a configuration error if none is set
    pub fn require_token(&self) -> Result<&str> {
        self.api
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                FerretError::config(
                    "AI_BUILDER_TOKEN is not configured; set it in the environment or a .env file",
                )
            })
    }

    /// Full URL of the chat completion endpoint
    pub fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.api.base_url.trim_end_matches('/'))
    }

    /// Full URL of the search endpoint
    pub fn search_url(&self) -> String {
        format!("{}/search/", self.api.base_url.trim_end_matches('/'))
    }
}
