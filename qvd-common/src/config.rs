//! Bootstrap configuration
//!
//! Settings are resolved with the following priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Built-in default (fallback)
//!
//! Arguments and environment variables are both parsed by the binary's clap
//! definition and arrive here as one [`ConfigOverrides`] value.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{Error, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5730;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 100;

/// Configuration file contents
///
/// Every field is optional; anything missing falls back to an override or a
/// built-in default during [`ServiceConfig::resolve`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub gemini: GeminiSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSection {
    /// sqlx connection URL, e.g. `sqlite:///var/lib/qvd/questions.db?mode=rwc`
    pub url: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSection {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub cloudfront_domain: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSection {
    pub ttl_secs: Option<u64>,
    pub max_entries: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level or EnvFilter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub s3_bucket: Option<String>,
    pub aws_region: Option<String>,
    pub cloudfront_domain: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub gemini: GeminiConfig,
    /// `None` when no bucket is configured; file uploads are then refused
    pub storage: Option<StorageConfig>,
    pub cache: CacheConfig,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: Option<String>,
    pub cloudfront_domain: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: u64,
}

impl ServiceConfig {
    /// Merge overrides over the TOML file over built-in defaults
    pub fn resolve(overrides: ConfigOverrides, toml: TomlConfig) -> Result<Self> {
        let gemini_api_key = first_valid(overrides.gemini_api_key, toml.gemini.api_key)
            .ok_or_else(|| {
                Error::Config(
                    "Gemini API key not configured. Set GEMINI_API_KEY, pass --gemini-api-key, \
                     or add api_key to the [gemini] section of the config file"
                        .to_string(),
                )
            })?;

        let database_url = match first_valid(overrides.database_url, toml.database.url) {
            Some(url) => url,
            None => default_database_url()?,
        };

        let storage = first_valid(overrides.s3_bucket, toml.storage.bucket).map(|bucket| {
            StorageConfig {
                bucket,
                region: first_valid(overrides.aws_region, toml.storage.region),
                cloudfront_domain: first_valid(
                    overrides.cloudfront_domain,
                    toml.storage.cloudfront_domain,
                ),
                access_key_id: first_valid(overrides.aws_access_key_id, toml.storage.access_key_id),
                secret_access_key: first_valid(
                    overrides.aws_secret_access_key,
                    toml.storage.secret_access_key,
                ),
            }
        });

        Ok(Self {
            host: first_valid(overrides.host, toml.server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(toml.server.port).unwrap_or(DEFAULT_PORT),
            database_url,
            max_connections: toml
                .database
                .max_connections
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            gemini: GeminiConfig {
                api_key: gemini_api_key,
                model: first_valid(overrides.gemini_model, toml.gemini.model)
                    .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: toml
                    .gemini
                    .base_url
                    .filter(|url| is_valid_value(url))
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
                timeout_secs: toml
                    .gemini
                    .timeout_secs
                    .unwrap_or(DEFAULT_GEMINI_TIMEOUT_SECS),
            },
            storage,
            cache: CacheConfig {
                ttl_secs: toml.cache.ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS),
                max_entries: toml.cache.max_entries.unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
            },
            log_level: first_valid(overrides.log_level, Some(toml.logging.level))
                .unwrap_or_else(default_log_level),
        })
    }
}

/// Reject empty or whitespace-only values
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

fn first_valid(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|v| is_valid_value(v))
        .or_else(|| fallback.filter(|v| is_valid_value(v)))
}

/// Load the TOML config file
///
/// An explicitly named file must exist. Without one, the platform config
/// locations are probed and a missing file yields all-default settings.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) => path,
            None => {
                debug!("No config file found, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// First existing config file: `~/.config/qvd/config.toml`, then `/etc/qvd/config.toml`
fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("qvd").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/qvd/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// `sqlite://<data dir>/qvd/questions.db?mode=rwc`
fn default_database_url() -> Result<String> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))?;
    let db_path = data_dir.join("qvd").join("questions.db");
    Ok(format!("sqlite://{}?mode=rwc", db_path.display()))
}
