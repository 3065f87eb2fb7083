//! Configuration Management Module
//!
//! Startup configuration for the pipeline: the completion API
//! credential and the database path are required; endpoint, model, bind
//! address, and history persistence are optional with defaults. Values
//! come from an optional TOML file with environment variables taking
//! precedence. Validation failures are fatal before any request is
//! served.

use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default chat-completion endpoint (OpenAI-compatible)
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
/// Default completion model
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";
/// Default HTTP bind port
pub const DEFAULT_PORT: u16 = 5000;
/// Fixed timeout for every completion request
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Resolved service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bearer credential for the completion endpoint
    pub api_key: String,
    /// SQLite database file path
    pub db_path: PathBuf,
    /// Completion endpoint base URL
    pub base_url: String,
    /// Completion model name
    pub model: String,
    /// HTTP bind host
    pub host: String,
    /// HTTP bind port
    pub port: u16,
    /// Conversation history file; persistence is off when unset
    pub history_path: Option<PathBuf>,
}

/// On-disk configuration file shape (every field optional, env wins)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FileConfig {
    api_key: Option<String>,
    db_path: Option<PathBuf>,
    base_url: Option<String>,
    model: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    history_path: Option<PathBuf>,
}

impl AppConfig {
    /// Build configuration from environment variables only
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::resolve(FileConfig::default())
    }

    /// Build configuration from a TOML file, then apply env overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        let file: FileConfig = toml::from_str(&raw).map_err(|e| {
            ServiceError::Config(format!("invalid config file {}: {e}", path.display()))
        })?;
        debug!("Loaded configuration file: {}", path.display());
        Self::resolve(file)
    }

    fn resolve(file: FileConfig) -> Result<Self, ServiceError> {
        let api_key = env_var("GROQ_API_KEY")
            .or(file.api_key)
            .ok_or_else(|| ServiceError::Config("GROQ_API_KEY is not set".to_string()))?;

        let db_path = env_var("DB_PATH")
            .map(PathBuf::from)
            .or(file.db_path)
            .ok_or_else(|| ServiceError::Config("DB_PATH is not set".to_string()))?;

        let port = match env_var("SQLSAGE_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ServiceError::Config(format!("invalid SQLSAGE_PORT: {raw}")))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let config = Self {
            api_key,
            db_path,
            base_url: env_var("SQLSAGE_BASE_URL")
                .or(file.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: env_var("SQLSAGE_MODEL")
                .or(file.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            host: env_var("SQLSAGE_HOST")
                .or(file.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            history_path: env_var("SQLSAGE_HISTORY").map(PathBuf::from).or(file.history_path),
        };

        config.validate()?;
        info!(
            "Configuration resolved: model={}, db={}",
            config.model,
            config.db_path.display()
        );
        Ok(config)
    }

    /// Reject configurations that cannot serve a single request
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.api_key.trim().is_empty() {
            return Err(ServiceError::Config("API key is empty".to_string()));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(ServiceError::Config("database path is empty".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ServiceError::Config("base URL is empty".to_string()));
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
