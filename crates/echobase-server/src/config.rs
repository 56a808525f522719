//! Server configuration loading from file and environment variables.

use echobase_voice::VoiceConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Vendor voice-pipeline settings (STT / LLM / TTS).
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Rate limiting settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "echobase_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Fixed-window rate limits, per minute.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Limit for ordinary API requests.
    #[serde(default = "default_rate_limit")]
    pub default_per_minute: u32,

    /// Limit for voice-turn requests. Each one fans out to three vendor
    /// calls, so it gets a tighter budget.
    #[serde(default = "default_voice_rate_limit")]
    pub voice_per_minute: u32,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "echobase.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rate_limit() -> u32 {
    120
}

fn default_voice_rate_limit() -> u32 {
    20
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_per_minute: default_rate_limit(),
            voice_per_minute: default_voice_rate_limit(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `ECHOBASE_HOST` overrides `server.host`
/// - `ECHOBASE_PORT` overrides `server.port`
/// - `ECHOBASE_DB_PATH` overrides `database.path`
/// - `ECHOBASE_LOG_LEVEL` overrides `logging.level`
/// - `ECHOBASE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `ECHOBASE_STT_API_KEY`, `ECHOBASE_LLM_API_KEY`, `ECHOBASE_TTS_API_KEY`
///   override the vendor API keys, so secrets can stay out of the file
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Ok(host) = std::env::var("ECHOBASE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("ECHOBASE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("ECHOBASE_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("ECHOBASE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("ECHOBASE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(key) = std::env::var("ECHOBASE_STT_API_KEY") {
        config.voice.stt.api_key = key;
    }
    if let Ok(key) = std::env::var("ECHOBASE_LLM_API_KEY") {
        config.voice.llm.api_key = key;
    }
    if let Ok(key) = std::env::var("ECHOBASE_TTS_API_KEY") {
        config.voice.tts.api_key = key;
    }

    Ok(config)
}
