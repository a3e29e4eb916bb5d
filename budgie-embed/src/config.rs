//! Configuration for the embedding client

use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default endpoint of a local OpenAI-compatible model runner.
pub const DEFAULT_BASE_URL: &str = "http://localhost:12434/engines/llama.cpp/v1";

/// Texts sent per `/embeddings` request.
pub const DEFAULT_BATCH_SIZE: usize = 16;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings for talking to an OpenAI-compatible embedding server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Model identifier passed in every request
    pub model_name: String,
    /// Base URL up to (not including) `/embeddings`
    pub base_url: String,
    /// Sent as a bearer token when present
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Maximum texts per request
    pub batch_size: usize,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Scale every returned vector to unit length
    pub normalize: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            model_name: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            batch_size: DEFAULT_BATCH_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            normalize: false,
        }
    }
}

impl EmbedConfig {
    /// Configuration for `model_name` against the default local endpoint.
    pub fn new<S: Into<String>>(model_name: S) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full URL of the embeddings endpoint. A trailing slash on the base URL
    /// is tolerated.
    pub fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }

    /// Checks the settings before any request is made.
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(EmbedError::invalid_config("embedding model name is empty"));
        }
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch size must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(EmbedError::invalid_config("timeout must be at least 1 second"));
        }
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(EmbedError::invalid_config(format!(
                "base URL must start with http:// or https://, got '{url}'"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EmbedConfig::new("ai/mxbai-embed-large");

        assert_eq!(config.model_name, "ai/mxbai-embed-large");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.api_key, None);
        assert!(!config.normalize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = EmbedConfig::new("nomic-embed-text")
            .with_base_url("https://example.test/v1/")
            .with_api_key("sk-test")
            .with_batch_size(4)
            .with_timeout_secs(5)
            .with_normalize(true);

        assert_eq!(config.embeddings_url(), "https://example.test/v1/embeddings");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.normalize);
    }

    #[test]
    fn test_validation() {
        assert!(EmbedConfig::default().validate().is_err());
        assert!(EmbedConfig::new("m").with_batch_size(0).validate().is_err());
        assert!(EmbedConfig::new("m").with_timeout_secs(0).validate().is_err());
        assert!(
            EmbedConfig::new("m")
                .with_base_url("localhost:8080")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let config = EmbedConfig::new("m").with_api_key("secret");
        let json = serde_json::to_string(&config).unwrap();

        assert!(!json.contains("secret"));
        let back: EmbedConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.api_key, None);
        assert_eq!(back.model_name, "m");
    }
}
