//! Error types for Quarry
//!
//! All modules use `QuarryResult<T>` as their return type.

use crate::request::HttpResponse;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Quarry operations
pub type QuarryResult<T> = Result<T, QuarryError>;

/// Boxed transport-level failure (DNS, connect, timeout, abort)
pub type TransportSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors that can occur in Quarry
#[derive(Error, Debug)]
pub enum QuarryError {
    // Resolution errors
    #[error("Resource identifier must be an opaque id, got {given:?}")]
    InvalidIdentifier { given: String },

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    // Request errors
    #[error("Concurrent unsettled request: {key}")]
    Concurrency { key: String },

    #[error("HTTP {} {}", .0.status, .0.url)]
    HttpStatus(Box<HttpResponse>),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportSource,
    },

    #[error("Response from {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: u64 },

    #[error("Cannot decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl QuarryError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport error for `url`
    pub fn transport(
        url: impl Into<String>,
        source: impl Into<TransportSource>,
    ) -> Self {
        Self::Transport {
            url: url.into(),
            source: source.into(),
        }
    }

    /// The failed response, if this error carries one
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Self::HttpStatus(response) => Some(response),
            _ => None,
        }
    }

    /// Check if a caller may reasonably retry.
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Concurrency { .. } | Self::Transport { .. } => true,
            Self::HttpStatus(response) => {
                response.status == 429 || (500..600).contains(&response.status)
            }
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Concurrency { .. } => Some("Wait for the in-flight request to settle"),
            Self::Transport { .. } => Some("Check the URL and your network connection"),
            Self::BodyTooLarge { .. } => Some("Raise http.max_body_bytes in the config file"),
            Self::ConfigInvalid { .. } => Some("Run: quarry config init --force"),
            Self::UnknownResource(_) => Some("Register the resource before resolving it"),
            _ => None,
        }
    }
}
