//! The shared chunk/embed/store and embed/search/filter paths.
//!
//! Ingestion and answering must use the same embedder against the same
//! store, so both live on one [`RagPipeline`]: [`RagPipeline::ingest`] for
//! the offline phase, [`RagPipeline::query`] for the per-question phase.
//!
//! ```rust,ignore
//! use edunexus_rag::{InMemoryVectorStore, MockEmbeddingProvider, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(MockEmbeddingProvider::new(64)))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! pipeline.create_collection("textbooks").await?;
//! pipeline.ingest("textbooks", &page).await?;
//! let relevant = pipeline.query("textbooks", "What is an atom?").await?;
//! ```

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::relevance::{KeywordFilter, RelevanceFilter};
use crate::vectorstore::VectorStore;

/// Embedder, store, chunker and relevance filter wired together.
///
/// Built with [`RagPipeline::builder`]; immutable afterwards.
pub struct RagPipeline {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    filter: Arc<dyn RelevanceFilter>,
}

impl RagPipeline {
    /// Start a [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Chunking and retrieval settings.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// The embedder used for both chunks and questions.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// The vector store holding every collection.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Create `name` sized for the embedder's vectors. Existing collections
    /// are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] wrapping the store's error.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        let dimensions = self.embedder.dimensions();
        debug!(collection = name, dimensions, model = self.embedder.model_id(), "ensuring collection");
        self.store
            .create_collection(name, dimensions)
            .await
            .map_err(|e| store_failure("create collection", name, e))
    }

    /// Drop `name` and everything in it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] wrapping the store's error.
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        self.store.delete_collection(name).await.map_err(|e| store_failure("delete collection", name, e))
    }

    /// Chunks stored in `name`, or `0` when there is no such collection.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the store cannot be read.
    pub async fn collection_count(&self, name: &str) -> Result<usize> {
        if !self.store.has_collection(name).await.map_err(|e| store_failure("inspect collection", name, e))? {
            return Ok(0);
        }
        self.store.count(name).await.map_err(|e| store_failure("count collection", name, e))
    }

    /// Chunk one document, embed the chunks `embedding_batch_size` at a time
    /// and upsert them. Returns the stored chunks with their vectors.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] naming the document if embedding
    /// or storing fails, or if the embedder returns the wrong number of
    /// vectors.
    pub async fn ingest(&self, collection: &str, document: &Document) -> Result<Vec<Chunk>> {
        let mut chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            debug!(document.id = %document.id, "document has no text to index");
            return Ok(chunks);
        }

        let vectors = self.embed_chunks(&document.id, &chunks).await?;
        for (chunk, vector) in chunks.iter_mut().zip(vectors) {
            chunk.embedding = vector;
        }

        if let Err(e) = self.store.upsert(collection, &chunks).await {
            error!(document.id = %document.id, collection, error = %e, "failed to store chunks");
            return Err(RagError::PipelineError(format!(
                "storing chunks of '{}' failed: {e}",
                document.id
            )));
        }

        info!(document.id = %document.id, collection, chunk_count = chunks.len(), "indexed document");
        Ok(chunks)
    }

    /// [`ingest`](Self::ingest) each document in turn, stopping at the first
    /// failure. Returns every stored chunk.
    ///
    /// # Errors
    ///
    /// The first document's error, as from [`ingest`](Self::ingest).
    pub async fn ingest_batch(&self, collection: &str, documents: &[Document]) -> Result<Vec<Chunk>> {
        let mut stored = Vec::new();
        for document in documents {
            stored.extend(self.ingest(collection, document).await?);
        }
        Ok(stored)
    }

    async fn embed_chunks(&self, document_id: &str, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.config.embedding_batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embedded = self.embedder.embed_batch(&texts).await.map_err(|e| {
                error!(document.id = document_id, error = %e, "failed to embed chunks");
                RagError::PipelineError(format!("embedding chunks of '{document_id}' failed: {e}"))
            })?;
            if embedded.len() != texts.len() {
                return Err(RagError::PipelineError(format!(
                    "embedder returned {} vectors for {} chunks of '{document_id}'",
                    embedded.len(),
                    texts.len()
                )));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    /// Write out anything the store buffered during ingestion.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] wrapping the store's error.
    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await.map_err(|e| {
            error!(error = %e, "failed to flush vector store");
            RagError::PipelineError(format!("failed to write the index: {e}"))
        })
    }

    /// Embed `question` and fetch its `top_k` nearest chunks, nearest first.
    /// No relevance filtering.
    ///
    /// A collection that was never created holds nothing, so it yields no
    /// candidates without embedding the question.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or search fails.
    pub async fn retrieve(&self, collection: &str, question: &str) -> Result<Vec<SearchResult>> {
        let exists = self
            .store
            .has_collection(collection)
            .await
            .map_err(|e| store_failure("inspect collection", collection, e))?;
        if !exists {
            debug!(collection, "collection does not exist; no candidates");
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(question).await.map_err(|e| {
            error!(error = %e, "failed to embed question");
            RagError::PipelineError(format!("embedding the question failed: {e}"))
        })?;

        let nearest = self
            .store
            .search(collection, &vector, self.config.top_k)
            .await
            .map_err(|e| store_failure("search collection", collection, e))?;
        debug!(collection, candidate_count = nearest.len(), top_k = self.config.top_k, "nearest chunks");
        Ok(nearest)
    }

    /// [`retrieve`](Self::retrieve), then drop candidates the relevance
    /// filter rejects. An empty result means nothing relevant was found and
    /// is not an error.
    ///
    /// # Errors
    ///
    /// As for [`retrieve`](Self::retrieve).
    pub async fn query(&self, collection: &str, question: &str) -> Result<Vec<SearchResult>> {
        let nearest = self.retrieve(collection, question).await?;
        let candidate_count = nearest.len();
        let relevant = self.filter.filter(question, nearest);
        info!(collection, candidate_count, result_count = relevant.len(), "retrieval finished");
        Ok(relevant)
    }
}

fn store_failure(action: &str, collection: &str, e: RagError) -> RagError {
    error!(collection, error = %e, "failed to {action}");
    RagError::PipelineError(format!("failed to {action} '{collection}': {e}"))
}

/// Builder for [`RagPipeline`].
///
/// `config`, `embedding_provider` and `vector_store` must be set. Without an
/// explicit chunker a [`FixedSizeChunker`] sized from the config is used;
/// without an explicit filter, [`KeywordFilter`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    filter: Option<Arc<dyn RelevanceFilter>>,
}

impl RagPipelineBuilder {
    /// Chunking and retrieval settings. Required.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Embedder for chunks and questions. Required.
    pub fn embedding_provider(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Where chunks are stored and searched. Required.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the default [`FixedSizeChunker`].
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Replace the default [`KeywordFilter`].
    pub fn relevance_filter(mut self, filter: Arc<dyn RelevanceFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Assemble the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] naming the first missing part.
    pub fn build(self) -> Result<RagPipeline> {
        let missing = |part: &str| RagError::ConfigError(format!("pipeline needs a {part}"));
        let config = self.config.ok_or_else(|| missing("config"))?;
        let embedder = self.embedder.ok_or_else(|| missing("embedding provider"))?;
        let store = self.store.ok_or_else(|| missing("vector store"))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)),
        };
        let filter = self.filter.unwrap_or_else(|| Arc::new(KeywordFilter));
        Ok(RagPipeline { config, embedder, store, chunker, filter })
    }
}
