use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use url::Url;

use crate::transport::http::SESSION_ID_PLACEHOLDER;

/// Application configuration module
/// This module handles loading, validating and saving the configuration.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Default source language tag, passed through unmodified
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Default target language tag, passed through unmodified
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Transformation service
    #[serde(default)]
    pub server: ServerConfig,

    /// Session limits
    #[serde(default)]
    pub session: SessionConfig,

    /// Where finished results are saved
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Transformation service configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Base URL of the service
    #[serde(default = "default_server_endpoint")]
    pub endpoint: String,

    /// Path of the handshake call
    #[serde(default = "default_handshake_path")]
    pub handshake_path: String,

    /// Path of the event stream; must contain `{session_id}`
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Path of the language catalog
    #[serde(default = "default_language_path")]
    pub language_path: String,

    /// Timeout of request/response calls in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_server_endpoint(),
            handshake_path: default_handshake_path(),
            stream_path: default_stream_path(),
            language_path: default_language_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Session configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionConfig {
    /// Deadline for a terminal event, armed when the stream opens
    #[serde(default = "default_session_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_session_timeout_secs(),
        }
    }
}

/// Record store backend
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    /// The remote record service
    #[default]
    Remote,
    /// A local SQLite database
    Local,
    /// Results are not saved
    Disabled,
}

impl std::fmt::Display for PersistenceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Remote => "remote",
            Self::Local => "local",
            Self::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for PersistenceBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            "disabled" | "none" => Ok(Self::Disabled),
            _ => Err(anyhow!("Invalid persistence backend: {}", s)),
        }
    }
}

/// Persistence configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub backend: PersistenceBackend,

    /// Base URL of the record service
    #[serde(default = "default_persistence_endpoint")]
    pub endpoint: String,

    /// Local database file; defaults under the user data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Owner of saved records
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Timeout of record service calls in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::default(),
            endpoint: default_persistence_endpoint(),
            database_path: None,
            user_id: default_user_id(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "zh".to_string()
}

fn default_target_language() -> String {
    "en".to_string()
}

fn default_server_endpoint() -> String {
    "http://localhost:5000".to_string()
}

fn default_handshake_path() -> String {
    "/api/modify_resume".to_string()
}

fn default_stream_path() -> String {
    format!("/api/modify_resume/stream/{}", SESSION_ID_PLACEHOLDER)
}

fn default_language_path() -> String {
    "/api/language".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_session_timeout_secs() -> u64 {
    300 // five minutes, long enough for a full multi-stage job
}

fn default_persistence_endpoint() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_user_id() -> String {
    "user123".to_string()
}

impl Config {
    /// Load the configuration at `path`, writing the defaults there when missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.source_language.trim().is_empty() || self.target_language.trim().is_empty() {
            return Err(anyhow!("Source and target language must not be empty"));
        }

        validate_endpoint("server.endpoint", &self.server.endpoint)?;

        if !self.server.stream_path.contains(SESSION_ID_PLACEHOLDER) {
            return Err(anyhow!(
                "server.stream_path must contain {}: {}",
                SESSION_ID_PLACEHOLDER,
                self.server.stream_path
            ));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(anyhow!("server.request_timeout_secs must be greater than zero"));
        }

        if self.session.timeout_secs == 0 {
            return Err(anyhow!("session.timeout_secs must be greater than zero"));
        }

        if self.persistence.backend == PersistenceBackend::Remote {
            validate_endpoint("persistence.endpoint", &self.persistence.endpoint)?;
            if self.persistence.request_timeout_secs == 0 {
                return Err(anyhow!("persistence.request_timeout_secs must be greater than zero"));
            }
        }

        Ok(())
    }
}

fn validate_endpoint(field: &str, endpoint: &str) -> Result<()> {
    if endpoint.trim().is_empty() {
        return Err(anyhow!("{} must not be empty", field));
    }
    Url::parse(endpoint).with_context(|| format!("{} is not a valid URL: {}", field, endpoint))?;
    Ok(())
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            server: ServerConfig::default(),
            session: SessionConfig::default(),
            persistence: PersistenceConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
