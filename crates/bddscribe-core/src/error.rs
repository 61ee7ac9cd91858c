//! Error handling for the bddscribe generation library.
//!
//! This module defines the main error type `Error` used throughout the
//! library, along with a convenient `Result` type alias. It uses `thiserror`
//! for easy error handling and implements conversions from common error
//! types.
//!
//! Most of the pipeline is deliberately lenient: malformed LLM output and
//! per-chunk failures are filtered or skipped, never raised. The variants
//! here cover the cases that genuinely stop a run — the documentation page
//! itself being unreachable, broken templates or configuration, and the
//! single fatal condition of a run that produced no usable endpoints.

use thiserror::Error;

/// Result type for bddscribe generation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bddscribe generation operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Failure fetching or chunking the documentation page
    #[error("Scrape error: {0}")]
    Scrape(String),

    /// Failure in the LLM extraction boundary
    #[error("Extraction error: {0}")]
    Extract(String),

    /// Template error
    #[error("Template error: {0}")]
    Template(String),

    /// Template engine error
    #[error("Template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The whole input produced zero usable endpoints — nothing to generate
    #[error("No usable endpoints were assembled from {0} chunk(s)")]
    NoEndpoints(usize),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new scrape error
    pub fn scrape<S: Into<String>>(msg: S) -> Self {
        Self::Scrape(msg.into())
    }

    /// Create a new extraction error
    pub fn extract<S: Into<String>>(msg: S) -> Self {
        Self::Extract(msg.into())
    }

    /// Create a new template error
    pub fn template<S: Into<String>>(msg: S) -> Self {
        Self::Template(msg.into())
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::Config(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::Config(s)
    }
}
