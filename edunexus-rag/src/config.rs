//! Configuration for the RAG pipeline and startup credential checks.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Environment variable holding the Groq API key.
pub const GROQ_API_KEY_VAR: &str = "GROQ_API_KEY";

/// Environment variable holding the Hugging Face token used for embeddings.
pub const HF_TOKEN_VAR: &str = "HF_TOKEN";

/// Prefix every Groq API key starts with.
const GROQ_KEY_PREFIX: &str = "gsk_";

/// Exact length of a Groq API key.
const GROQ_KEY_LEN: usize = 56;

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of nearest chunks to retrieve per question.
    pub top_k: usize,
    /// Number of chunk texts sent to the embedding provider per request
    /// during ingestion.
    pub embedding_batch_size: usize,
    /// Optional cap on the assembled context length in characters.
    /// `None` keeps every surviving chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_context_chars: Option<usize>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            embedding_batch_size: 32,
            max_context_chars: None,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set how many chunks are embedded per provider request.
    pub fn embedding_batch_size(mut self, size: usize) -> Self {
        self.config.embedding_batch_size = size;
        self
    }

    /// Cap the assembled context at `chars` characters.
    pub fn max_context_chars(mut self, chars: Option<usize>) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `embedding_batch_size == 0`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.config.embedding_batch_size == 0 {
            return Err(RagError::ConfigError(
                "embedding_batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(self.config)
    }
}

/// Check the shape of a Groq API key: `gsk_` prefix, 56 characters.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] if the key is malformed.
pub fn validate_groq_api_key(key: &str) -> Result<()> {
    if !key.starts_with(GROQ_KEY_PREFIX) || key.chars().count() != GROQ_KEY_LEN {
        return Err(RagError::ConfigError(format!(
            "invalid {GROQ_API_KEY_VAR}: expected a {GROQ_KEY_LEN}-character key starting with \
             '{GROQ_KEY_PREFIX}'; check your .env file"
        )));
    }
    Ok(())
}

/// Read a required, non-empty environment variable (surrounding whitespace
/// is trimmed).
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] if the variable is unset or blank.
pub fn require_env(name: &str) -> Result<String> {
    let value = std::env::var(name).unwrap_or_default();
    let value = value.trim();
    if value.is_empty() {
        return Err(RagError::ConfigError(format!("{name} missing from the environment or .env file")));
    }
    Ok(value.to_string())
}

/// Read and validate the Groq API key from the environment.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] if the key is missing or malformed.
pub fn groq_api_key_from_env() -> Result<String> {
    let key = std::env::var(GROQ_API_KEY_VAR).unwrap_or_default();
    let key = key.trim().to_string();
    validate_groq_api_key(&key)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_textbook_ingestion() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.max_context_chars, None);
    }

    #[test]
    fn builder_rejects_overlap_not_smaller_than_chunk() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn builder_rejects_zero_top_k() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
    }

    #[test]
    fn builder_rejects_zero_batch_size() {
        assert!(RagConfig::builder().embedding_batch_size(0).build().is_err());
    }

    #[test]
    fn builder_accepts_valid_values() {
        let config = RagConfig::builder()
            .chunk_size(200)
            .chunk_overlap(50)
            .top_k(5)
            .max_context_chars(Some(4000))
            .build()
            .unwrap();
        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.max_context_chars, Some(4000));
    }

    #[test]
    fn groq_key_must_have_prefix_and_length() {
        let valid = format!("gsk_{}", "a".repeat(52));
        assert!(validate_groq_api_key(&valid).is_ok());

        let wrong_prefix = format!("sk-_{}", "a".repeat(52));
        assert!(validate_groq_api_key(&wrong_prefix).is_err());

        let too_short = format!("gsk_{}", "a".repeat(10));
        assert!(validate_groq_api_key(&too_short).is_err());

        assert!(validate_groq_api_key("").is_err());
    }
}
