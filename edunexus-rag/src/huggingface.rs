//! Hugging Face embedding provider using the inference feature-extraction API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default Hugging Face inference endpoint.
pub const HF_INFERENCE_BASE: &str = "https://router.huggingface.co/hf-inference/models";

/// The default sentence-embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// The dimensionality of `all-MiniLM-L6-v2`.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

const PROVIDER: &str = "HuggingFace";

/// Connection settings for [`HuggingFaceEmbeddingProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct HuggingFaceConfig {
    /// Access token sent as a bearer token.
    pub token: String,
    /// Model repository id.
    pub model: String,
    /// Vector dimensionality of `model`.
    pub dimensions: usize,
    /// Inference endpoint base URL; the model id is appended to it.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl HuggingFaceConfig {
    /// Settings for the default MiniLM model.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            base_url: HF_INFERENCE_BASE.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Use a different model. `dimensions` must match the model's output size.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    /// Point at a different inference endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Full feature-extraction URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}/pipeline/feature-extraction",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// An [`EmbeddingProvider`] backed by the Hugging Face inference API.
///
/// # Example
///
/// ```rust,ignore
/// use edunexus_rag::huggingface::{HuggingFaceConfig, HuggingFaceEmbeddingProvider};
///
/// let provider = HuggingFaceEmbeddingProvider::new(HuggingFaceConfig::new(token))?;
/// let embedding = provider.embed("What is an atom?").await?;
/// ```
pub struct HuggingFaceEmbeddingProvider {
    client: reqwest::Client,
    config: HuggingFaceConfig,
}

impl HuggingFaceEmbeddingProvider {
    /// Create a new provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the token is empty and
    /// [`RagError::EmbeddingError`] if the HTTP client cannot be built.
    pub fn new(config: HuggingFaceConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(RagError::ConfigError("Hugging Face token must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }
}

// ── Hugging Face API request/response types ────────────────────────

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [&'a str],
    options: RequestOptions,
}

#[derive(Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.config.model,
            "embedding batch"
        );

        let request_body =
            FeatureExtractionRequest { inputs: texts, options: RequestOptions { wait_for_model: true } };

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.token)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::EmbeddingError {
                    provider: PROVIDER.into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let embeddings: Vec<Vec<f32>> = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        check_shape(&embeddings, texts.len(), self.config.dimensions)?;
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

/// One vector per input, each of the configured dimensionality.
fn check_shape(embeddings: &[Vec<f32>], expected: usize, dimensions: usize) -> Result<()> {
    if embeddings.len() != expected {
        return Err(RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: format!("expected {expected} embeddings, got {}", embeddings.len()),
        });
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
        return Err(RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: format!("expected {dimensions}-dimensional vectors, got {}", bad.len()),
        });
    }
    Ok(())
}
