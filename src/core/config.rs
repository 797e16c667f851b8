//! Configuration management for Datalyst
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/datalyst/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{DatalystError, Result};

/// Main configuration for Datalyst
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection
    pub database: DatabaseConfig,
    /// Hosted model configuration
    pub model: ModelConfig,
    /// Context-server channel configuration
    pub channel: ChannelConfig,
    /// Agent behavior configuration
    pub agent: AgentConfig,
    /// Conversation store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string handed to the context server
    ///
    /// Absence is a fatal condition at channel connect time.
    pub url: Option<String>,
}

/// Hosted model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier on the provider
    pub name: String,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Context-server subprocess configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Runtime command that hosts the server
    pub command: String,
    /// Path to the server script
    pub script: String,
    /// Per-request timeout in seconds, also bounds the handshake
    pub timeout_secs: u64,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum tool-call cycles before the loop gives up
    pub max_turns: usize,
    /// System prompt override
    pub system_prompt: Option<String>,
    /// Whether to show debug output
    pub debug: bool,
}

/// Conversation store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of cached threads before eviction
    pub capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            model: ModelConfig::default(),
            channel: ChannelConfig::default(),
            agent: AgentConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("DATABASE_URL").ok(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: env::var("DATALYST_MODEL").unwrap_or_else(|_| "openai/gpt-oss-20b".to_string()),
            base_url: env::var("GROQ_BASE_URL")
                .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
            temperature: 0.0,
            timeout_secs: 120,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command: env::var("DATALYST_CHANNEL_COMMAND").unwrap_or_else(|_| "node".to_string()),
            script: env::var("DATALYST_CHANNEL_SCRIPT").unwrap_or_else(|_| {
                "node_modules/@zeddotdev/postgres-context-server/index.mjs".to_string()
            }),
            timeout_secs: 30,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: env::var("DATALYST_MAX_TURNS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            system_prompt: None,
            debug: env::var("DATALYST_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("datalyst")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Pick up a .env file when present
        let _ = dotenvy::dotenv();

        if let Ok(config) = Self::load_from_file() {
            return config;
        }

        // Fall back to defaults (which respect env vars)
        Self::default()
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(DatalystError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| DatalystError::config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| DatalystError::config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| DatalystError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| DatalystError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(Self::config_file(), content)
            .map_err(|e| DatalystError::config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Database connection string, failing when it is absent
    pub fn database_url(&self) -> Result<&str> {
        self.database
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| DatalystError::config("DATABASE_URL must be set"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.temperature, 0.0);
        assert_eq!(config.channel.timeout_secs, 30);
        assert_eq!(config.agent.max_turns, 10);
        assert_eq!(config.store.capacity, 256);
    }

    #[test]
    fn test_missing_database_url_is_an_error() {
        let mut config = Config::default();
        config.database.url = None;
        assert!(config.database_url().is_err());

        config.database.url = Some(String::new());
        assert!(config.database_url().is_err());

        config.database.url = Some("postgres://localhost/app".to_string());
        assert_eq!(config.database_url().unwrap(), "postgres://localhost/app");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("max_turns"));
        assert!(toml_str.contains("timeout_secs"));
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("datalyst"));
    }
}
