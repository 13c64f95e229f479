//! Answer generation: prompt template + language model call.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{RagError, Result};
use crate::llm::LanguageModel;

/// Instructions sent ahead of every question.
pub const PROMPT_INSTRUCTIONS: &str = "\
You are a friendly school teacher helping students from grades 5–10.
Answer the question in a clear, simple, and concise way (2–3 sentences unless more detail is requested) that a young student can understand.
Use the provided textbook excerpts only if they directly relate to the question.
If the excerpts are irrelevant or missing, rely entirely on your own knowledge to provide an accurate answer.
Do NOT mention missing or unhelpful excerpts—just give the best answer possible.
If you are unsure, say “I’m not sure, let me check,” but avoid this unless absolutely necessary.";

/// Compose the full prompt: instructions, excerpts, question.
///
/// An empty context leaves the excerpts section blank; the instructions
/// already tell the model to fall back on its own knowledge.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!("{PROMPT_INSTRUCTIONS}\n\nTextbook Excerpts:\n{context}\n\nQuestion: {question}\nAnswer:")
}

/// Turns a context block and a question into an answer.
#[derive(Clone)]
pub struct AnswerGenerator {
    model: Arc<dyn LanguageModel>,
}

impl AnswerGenerator {
    /// Create a generator backed by `model`.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// The underlying model's name.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Generate an answer. Called even when `context` is empty.
    ///
    /// # Errors
    ///
    /// Propagates the model's error unchanged (retries are the model
    /// client's business), and returns [`RagError::GenerationError`] if the
    /// model answers with only whitespace.
    pub async fn generate(&self, context: &str, question: &str) -> Result<String> {
        let prompt = build_prompt(context, question);
        debug!(model = self.model.name(), prompt_len = prompt.len(), grounded = !context.is_empty(), "generating answer");

        let completion = self.model.invoke(&prompt).await?;
        debug!(raw_answer = %completion.content, "model responded");

        let answer = completion.content.trim();
        if answer.is_empty() {
            return Err(RagError::GenerationError {
                provider: self.model.name().to_string(),
                message: "model returned an empty answer".into(),
                transient: false,
            });
        }

        info!(model = self.model.name(), answer_len = answer.len(), "answer generated");
        Ok(answer.to_string())
    }
}
