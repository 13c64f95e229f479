//! # edunexus-rag
//!
//! Retrieval-augmented question answering over school textbooks.
//!
//! ## Overview
//!
//! Two phases share one embedding model and one vector index:
//!
//! - **Ingestion** ([`IndexBuilder`]): PDF pages → overlapping chunks →
//!   embeddings → a durable [`LocalVectorStore`] collection.
//! - **Answering** ([`Assistant`]): question → embedding → top-K nearest
//!   chunks → [`KeywordFilter`] → context block → [`AnswerGenerator`] →
//!   answer. When nothing relevant is found the context is empty and the
//!   model answers from its own knowledge.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use edunexus_rag::*;
//!
//! let store = LocalVectorStore::open("edunexus_index").await?;
//! let pipeline = Arc::new(
//!     RagPipeline::builder()
//!         .config(RagConfig::default())
//!         .embedding_provider(Arc::new(HuggingFaceEmbeddingProvider::new(HuggingFaceConfig::new(hf_token))?))
//!         .vector_store(Arc::new(store))
//!         .build()?,
//! );
//! let generator = AnswerGenerator::new(Arc::new(GroqClient::new(GroqConfig::new(groq_key))?));
//! let assistant = Assistant::new(pipeline, generator, "textbooks");
//! let answer = assistant.ask("What is photosynthesis?").await?;
//! ```

pub mod assistant;
pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod groq;
pub mod huggingface;
pub mod ingest;
pub mod inmemory;
pub mod llm;
pub mod loader;
pub mod local;
pub mod mock;
pub mod pipeline;
pub mod relevance;
pub mod vectorstore;

pub use assistant::{Answer, Assistant};
pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use context::{assemble, assemble_capped};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::{AnswerGenerator, build_prompt};
pub use groq::{GroqClient, GroqConfig};
pub use huggingface::{HuggingFaceConfig, HuggingFaceEmbeddingProvider};
pub use ingest::{IndexBuilder, IngestReport, SkippedFile};
pub use inmemory::InMemoryVectorStore;
pub use llm::{Completion, LanguageModel};
pub use loader::{DocumentLoader, LoaderSet, PdfLoader, TextLoader};
pub use local::{CollectionInfo, LocalVectorStore};
pub use mock::{MockEmbeddingProvider, MockLanguageModel};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use relevance::{KeywordFilter, PassThroughFilter, RelevanceFilter};
pub use vectorstore::VectorStore;

/// Collection the textbooks are ingested into unless told otherwise.
pub const DEFAULT_COLLECTION: &str = "textbooks";
