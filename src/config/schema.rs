//! Configuration schema for Quarry
//!
//! Configuration is stored at `~/.config/quarry/config.toml`

use crate::resource::DEFAULT_LIFESPAN_SECS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Response body cap when none is configured (10 MiB)
pub const DEFAULT_MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// HTTP client settings
    pub http: HttpConfig,

    /// Persistent cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds (0 = none)
    pub timeout_secs: u64,

    /// User-Agent sent when a request sets none
    pub user_agent: String,

    /// Largest response body accepted, in bytes
    pub max_body_bytes: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("quarry/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Persistent cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifespan for cached resources that do not set their own
    pub default_lifespan_secs: u64,

    /// Store file (defaults to the state directory)
    pub store_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_lifespan_secs: DEFAULT_LIFESPAN_SECS,
            store_path: None,
        }
    }
}
