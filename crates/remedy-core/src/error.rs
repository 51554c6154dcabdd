//! Unified error types for Remedy

use thiserror::Error;

/// Unified error type for all Remedy operations
#[derive(Error, Debug)]
pub enum RemedyError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid repository spec '{0}' (expected owner/repo)")]
    InvalidRepoSpec(String),

    // Provider errors
    #[error("Provider returned HTTP {status} for {url}")]
    Provider { status: u16, url: String },

    #[error("Rate limit still active after {retries} retries: {url}")]
    RateLimited { retries: u32, url: String },

    #[error("HTTP error: {0}")]
    Http(String),

    // Pipeline errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Clustering error: {0}")]
    Clustering(String),

    #[error("Malformed record on line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    #[error("Template error: {0}")]
    Template(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl RemedyError {
    /// Whether the error came from the remote provider and only affects one item
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. } | Self::Http(_) | Self::RateLimited { .. }
        )
    }
}

/// Result type alias using RemedyError
pub type Result<T> = std::result::Result<T, RemedyError>;
