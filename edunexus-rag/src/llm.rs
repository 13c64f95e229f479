//! Language model trait used by the answer generator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Text returned by a language model for one prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text, as returned by the provider.
    pub content: String,
}

/// A text-in, text-out language model.
///
/// Implementations own their retry and timeout policy; callers treat a
/// returned error as final for that prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logs.
    fn name(&self) -> &str;

    /// Send a single prompt and return the model's completion.
    async fn invoke(&self, prompt: &str) -> Result<Completion>;
}
