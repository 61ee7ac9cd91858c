//! Configuration management for bddscribe test generation.
//!
//! This module defines the `Config` struct and related functionality for
//! managing generation settings. The configuration can be loaded from a YAML
//! or TOML file, created programmatically, or built from command-line
//! arguments by the CLI crate.
//!
//! # Examples
//!
//! ```no_run
//! use bddscribe_core::config::Config;
//!
//! let mut config = Config::new(
//!     "https://demoqa.com/swagger/",
//!     "gpt-3.5-turbo",
//!     "generated",
//! );
//! config.max_optional_params = 3;
//! ```

// Internal imports (std, crate)
use std::path::Path;

// External imports (alphabetized)
use serde::{Deserialize, Deserializer, Serialize};
use serde_value::Value as SerdeValue;
use tokio::fs;
use url::Url;

/// Configuration for one generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// URL of the Swagger UI documentation page to scrape
    pub swagger_url: String,

    /// Model identifier passed to the extraction backend
    #[serde(default = "default_model")]
    pub model: String,

    /// Output directory for generated feature and step files
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Base URL of the API under test, baked into generated step stubs
    #[serde(default)]
    pub api_base_url: Option<Url>,

    /// Optional MLflow tracking server URI; metrics are skipped without it
    #[serde(default)]
    pub tracking_uri: Option<String>,

    /// Optional directory of custom Tera templates overriding the built-ins
    #[serde(default)]
    pub template_dir: Option<String>,

    /// Cap on optional parameters expanded into scenario combinations.
    /// Combination count is 2^n, so this bounds feature-file blowup for
    /// endpoints with many optional parameters.
    #[serde(default = "default_max_optional_params")]
    pub max_optional_params: usize,

    /// Number of extraction calls kept in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds for page fetch and extraction calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// CSS classes tried, in order, when no operation blocks are found with
    /// the standard Swagger UI selectors. Accepts a single string or a list.
    #[serde(
        default = "default_fallback_selectors",
        deserialize_with = "deserialize_string_or_seq"
    )]
    pub fallback_selectors: Vec<String>,
}

impl Config {
    /// Create a new Config with default values
    pub fn new(
        swagger_url: impl Into<String>,
        model: impl Into<String>,
        output_dir: impl Into<String>,
    ) -> Self {
        Self {
            swagger_url: swagger_url.into(),
            model: model.into(),
            output_dir: output_dir.into(),
            api_base_url: None,
            tracking_uri: None,
            template_dir: None,
            max_optional_params: default_max_optional_params(),
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            fallback_selectors: default_fallback_selectors(),
        }
    }

    /// Load configuration from a YAML or TOML file, dispatching on extension
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).await?;
        Ok(())
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_output_dir() -> String {
    "generated".to_string()
}

fn default_max_optional_params() -> usize {
    4
}

fn default_concurrency() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_fallback_selectors() -> Vec<String> {
    vec![
        "operation-tag-content".to_string(),
        "opblock-summary".to_string(),
        "opblock-section".to_string(),
    ]
}

/// Helper function to deserialize either a single selector or a list
fn deserialize_string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = SerdeValue::deserialize(deserializer)?;

    match value {
        SerdeValue::String(s) => Ok(vec![s]),
        SerdeValue::Seq(seq) => {
            let mut result = Vec::new();
            for item in seq {
                if let SerdeValue::String(s) = item {
                    result.push(s);
                } else {
                    return Err(serde::de::Error::custom(
                        "Expected string or array of strings",
                    ));
                }
            }
            Ok(result)
        }
        _ => Err(serde::de::Error::custom(
            "Expected string or array of strings",
        )),
    }
}
