//! Offline stand-ins for the embedding and language model services.
//!
//! Useful in tests and for trying the pipeline without credentials. Both
//! mocks record how often they were called.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::{Completion, LanguageModel};

/// Deterministic bag-of-words embeddings.
///
/// Every lowercase word is hashed (FNV-1a) into one of `dimensions` buckets
/// and the resulting count vector is L2-normalised, so texts sharing words
/// land close to each other. Text without words maps to the zero vector.
#[derive(Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
    fail: bool,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    /// Model id reported by [`MockEmbeddingProvider`].
    pub const MODEL_ID: &'static str = "mock/bag-of-words";

    /// Create a provider producing `dimensions`-dimensional vectors.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, fail: false, calls: AtomicUsize::new(0) }
    }

    /// A provider whose every call fails.
    pub fn failing() -> Self {
        Self { dimensions: 8, fail: true, calls: AtomicUsize::new(0) }
    }

    /// Number of `embed`/`embed_batch` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return v;
        }
        for word in text.split_whitespace() {
            let word: String =
                word.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect();
            if word.is_empty() {
                continue;
            }
            let hash = word
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3));
            v[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }

    fn check(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RagError::EmbeddingError {
                provider: "Mock".into(),
                message: "request failed: embedding service unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.check()?;
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.check()?;
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        Self::MODEL_ID
    }
}

/// A language model that returns a canned reply and records every prompt.
#[derive(Debug)]
pub struct MockLanguageModel {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLanguageModel {
    /// Always answer with `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: Ok(reply.into()), prompts: Mutex::new(Vec::new()) }
    }

    /// Always fail with a transient generation error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { reply: Err(message.into()), prompts: Mutex::new(Vec::new()) }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(&self, prompt: &str) -> Result<Completion> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).push(prompt.to_string());
        match &self.reply {
            Ok(content) => Ok(Completion { content: content.clone() }),
            Err(message) => Err(RagError::GenerationError {
                provider: "Mock".into(),
                message: message.clone(),
                transient: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorstore::cosine_similarity;

    #[tokio::test]
    async fn embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new(64);
        let a = provider.embed("Newton's second law").await.unwrap();
        let b = provider.embed("Newton's second law").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn shared_words_are_closer_than_unrelated_text() {
        let provider = MockEmbeddingProvider::new(256);
        let query = provider.embed("What is Newton's second law?").await.unwrap();
        let related = provider.embed("Newton's second law states force equals mass").await.unwrap();
        let unrelated = provider.embed("Mitochondria produce energy").await.unwrap();
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn failing_language_model_records_prompt() {
        let model = MockLanguageModel::failing("boom");
        assert!(model.invoke("hello").await.is_err());
        assert_eq!(model.prompts(), vec!["hello".to_string()]);
    }
}
