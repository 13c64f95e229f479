//! The per-question retrieval-and-answer loop.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::context::assemble_capped;
use crate::document::SearchResult;
use crate::error::Result;
use crate::generation::AnswerGenerator;
use crate::pipeline::RagPipeline;

/// The result of one question.
#[derive(Debug, Clone)]
pub struct Answer {
    /// The question as asked.
    pub question: String,
    /// The model's answer, trimmed.
    pub text: String,
    /// The context block sent to the model; empty when nothing relevant
    /// was found.
    pub context: String,
    /// Retrieved chunks that survived the relevance filter, nearest first.
    pub sources: Vec<SearchResult>,
}

impl Answer {
    /// Whether any textbook excerpt was offered to the model.
    pub fn is_grounded(&self) -> bool {
        !self.context.is_empty()
    }
}

/// Answers questions against one collection.
///
/// Each call to [`Assistant::ask`] is independent: embed → retrieve →
/// filter → assemble → generate, with nothing carried over between calls.
#[derive(Clone)]
pub struct Assistant {
    pipeline: Arc<RagPipeline>,
    generator: AnswerGenerator,
    collection: String,
}

impl Assistant {
    /// Create an assistant over `collection`.
    pub fn new(
        pipeline: Arc<RagPipeline>,
        generator: AnswerGenerator,
        collection: impl Into<String>,
    ) -> Self {
        Self { pipeline, generator, collection: collection.into() }
    }

    /// The collection questions are answered from.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The underlying pipeline.
    pub fn pipeline(&self) -> &Arc<RagPipeline> {
        &self.pipeline
    }

    /// Number of chunks available for retrieval.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector store cannot be read.
    pub async fn indexed_chunks(&self) -> Result<usize> {
        self.pipeline.collection_count(&self.collection).await
    }

    /// Answer one question.
    ///
    /// When no retrieved chunk passes the relevance filter the model is
    /// still called, with an empty context, and answers from its own
    /// knowledge.
    ///
    /// # Errors
    ///
    /// Returns the first embedding, retrieval or generation error. The
    /// caller decides whether to carry on with the next question.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let sources = self.pipeline.query(&self.collection, question).await?;
        if sources.is_empty() {
            info!("no relevant excerpts; answering from model knowledge");
        }

        let texts: Vec<&str> = sources.iter().map(SearchResult::text).collect();
        let context = assemble_capped(&texts, self.pipeline.config().max_context_chars);

        let text = self.generator.generate(&context, question).await?;
        Ok(Answer { question: question.to_string(), text, context, sources })
    }
}
