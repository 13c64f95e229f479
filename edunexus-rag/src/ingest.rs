//! Offline index building: files → documents → chunks → vectors → store.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::loader::LoaderSet;
use crate::pipeline::RagPipeline;

/// A source file that was not ingested, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    /// The path as given.
    pub path: PathBuf,
    /// Human-readable reason.
    pub reason: String,
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Files that were loaded and ingested.
    pub files_loaded: Vec<PathBuf>,
    /// Files that were missing or could not be read.
    pub files_skipped: Vec<SkippedFile>,
    /// Documents (pages) produced by the loaders.
    pub documents: usize,
    /// Chunks written during this run.
    pub chunks: usize,
    /// Chunks in the collection after the run.
    pub collection_count: usize,
}

/// Builds or extends one collection from a list of source files.
///
/// Missing and unreadable files are skipped with a warning; the run carries
/// on with whatever is left, even nothing, and the collection is created
/// regardless so the online phase finds an (empty) index. Embedding and
/// storage failures abort the run.
///
/// # Example
///
/// ```rust,ignore
/// let report = IndexBuilder::new(&pipeline, "textbooks")
///     .rebuild(true)
///     .run(&paths)
///     .await?;
/// println!("{} chunks", report.chunks);
/// ```
pub struct IndexBuilder<'a> {
    pipeline: &'a RagPipeline,
    collection: String,
    loaders: LoaderSet,
    rebuild: bool,
}

impl<'a> IndexBuilder<'a> {
    /// Ingest into `collection` with the default loaders.
    pub fn new(pipeline: &'a RagPipeline, collection: impl Into<String>) -> Self {
        Self { pipeline, collection: collection.into(), loaders: LoaderSet::default(), rebuild: false }
    }

    /// Replace the loaders.
    pub fn loaders(mut self, loaders: LoaderSet) -> Self {
        self.loaders = loaders;
        self
    }

    /// Drop the existing collection before ingesting.
    pub fn rebuild(mut self, rebuild: bool) -> Self {
        self.rebuild = rebuild;
        self
    }

    /// Run ingestion over `paths` in order, then flush the store so
    /// everything ingested so far is on disk, even when the run fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be created, a document
    /// fails to embed or store, or the store cannot be flushed.
    pub async fn run(&self, paths: &[PathBuf]) -> Result<IngestReport> {
        let outcome = self.ingest_all(paths).await;
        let flushed = self.pipeline.flush().await;
        let mut report = outcome?;
        flushed?;

        report.collection_count = self.pipeline.collection_count(&self.collection).await?;
        info!(
            collection = %self.collection,
            files_loaded = report.files_loaded.len(),
            files_skipped = report.files_skipped.len(),
            documents = report.documents,
            chunks = report.chunks,
            collection_count = report.collection_count,
            "ingestion finished"
        );
        Ok(report)
    }

    async fn ingest_all(&self, paths: &[PathBuf]) -> Result<IngestReport> {
        if self.rebuild {
            info!(collection = %self.collection, "dropping collection for rebuild");
            self.pipeline.delete_collection(&self.collection).await?;
        }
        self.pipeline.create_collection(&self.collection).await?;

        let mut report = IngestReport::default();
        for path in paths {
            match self.ingest_file(path).await? {
                Ok((documents, chunks)) => {
                    report.documents += documents;
                    report.chunks += chunks;
                    report.files_loaded.push(path.clone());
                }
                Err(reason) => {
                    warn!(path = %path.display(), %reason, "skipping file");
                    report.files_skipped.push(SkippedFile { path: path.clone(), reason });
                }
            }
        }

        Ok(report)
    }

    /// Outer error aborts the run; inner error is a skip reason.
    async fn ingest_file(&self, path: &Path) -> Result<std::result::Result<(usize, usize), String>> {
        if !path.is_file() {
            return Ok(Err("missing or not a regular file".to_string()));
        }
        let documents = match self.loaders.load(path).await {
            Ok(documents) => documents,
            Err(e) => return Ok(Err(e.to_string())),
        };
        let chunks = self.pipeline.ingest_batch(&self.collection, &documents).await?;
        info!(path = %path.display(), documents = documents.len(), chunks = chunks.len(), "ingested file");
        Ok(Ok((documents.len(), chunks.len())))
    }
}
