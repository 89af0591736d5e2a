use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for console-query setup operations
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Errors raised while configuring the client or mounting controllers.
///
/// Request failures never use this type; they surface as
/// [`ApiError`](crate::analysis::ApiError) inside controller state.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Query key '{key}' is used more than once in the same set")]
    DuplicateQueryKey { key: String },

    #[error("General error: {message}")]
    General { message: String },
}

impl ConsoleError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a new duplicate query key error
    pub fn duplicate_key<S: Into<String>>(key: S) -> Self {
        Self::DuplicateQueryKey { key: key.into() }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }
}
