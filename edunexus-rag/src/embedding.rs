//! Text → vector.

use async_trait::async_trait;

use crate::error::Result;

/// Turns text into fixed-length vectors.
///
/// Chunks and questions must be embedded by the same model
/// ([`model_id`](EmbeddingProvider::model_id)): vectors from different
/// models are not comparable and search across them silently returns
/// nonsense. The persisted index records the model id so a mismatch can be
/// reported when the index is opened.
///
/// ```rust,ignore
/// let provider = HuggingFaceEmbeddingProvider::new(HuggingFaceConfig::new(token))?;
/// let vector = provider.embed("What is photosynthesis?").await?;
/// assert_eq!(vector.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text into a vector of [`dimensions`](EmbeddingProvider::dimensions) floats.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// One vector per input, in input order. Falls back to one
    /// [`embed`](EmbeddingProvider::embed) call per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Model identifier, e.g. `sentence-transformers/all-MiniLM-L6-v2`.
    fn model_id(&self) -> &str;
}
