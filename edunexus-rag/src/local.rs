//! Durable, file-backed vector store.
//!
//! Each collection lives in `<dir>/<collection>.json` together with a small
//! manifest: format version, vector dimensions, the embedding model that
//! produced the vectors and the time of the last write. The whole index is
//! loaded into memory on [`LocalVectorStore::open`].
//!
//! By default every mutation is applied to a copy of the collection, the copy
//! is written through a temporary file and a rename, and only then does it
//! replace the in-memory collection: a failed write leaves both memory and
//! disk at the previous version. A store opened
//! [`with_deferred_writes`](LocalVectorStore::with_deferred_writes) instead
//! mutates in memory and writes each changed collection once on
//! [`VectorStore::flush`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, rank};

/// Version of the on-disk collection format.
pub const INDEX_FORMAT_VERSION: u32 = 1;

const BACKEND: &str = "Local";

/// Summary of a persisted collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Dimensionality of the stored vectors.
    pub dimensions: usize,
    /// Embedding model that produced the stored vectors, if recorded.
    pub embedding_model: Option<String>,
    /// Number of stored chunks.
    pub count: usize,
    /// Time of the last write.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCollection {
    version: u32,
    name: String,
    dimensions: usize,
    embedding_model: Option<String>,
    updated_at: DateTime<Utc>,
    chunks: BTreeMap<String, Chunk>,
}

impl StoredCollection {
    fn info(&self) -> CollectionInfo {
        CollectionInfo {
            name: self.name.clone(),
            dimensions: self.dimensions,
            embedding_model: self.embedding_model.clone(),
            count: self.chunks.len(),
            updated_at: self.updated_at,
        }
    }
}

/// A vector store persisted as one JSON file per collection.
///
/// # Example
///
/// ```rust,ignore
/// use edunexus_rag::{LocalVectorStore, VectorStore};
///
/// let store = LocalVectorStore::open("edunexus_index")
///     .await?
///     .with_embedding_model("sentence-transformers/all-MiniLM-L6-v2");
/// store.create_collection("textbooks", 384).await?;
/// ```
#[derive(Debug)]
pub struct LocalVectorStore {
    dir: PathBuf,
    embedding_model: Option<String>,
    deferred: bool,
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, StoredCollection>,
    /// Collections changed since the last flush; only used with deferred writes.
    dirty: BTreeSet<String>,
}

impl LocalVectorStore {
    /// Open (creating if needed) the index directory and load every
    /// collection file found in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or read, or if a
    /// collection file is unreadable or was written by an unknown format
    /// version.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let mut collections = HashMap::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            let stored: StoredCollection = serde_json::from_slice(&bytes).map_err(|e| {
                RagError::VectorStoreError {
                    backend: BACKEND.to_string(),
                    message: format!("failed to read '{}': {e}", path.display()),
                }
            })?;
            if stored.version != INDEX_FORMAT_VERSION {
                return Err(RagError::VectorStoreError {
                    backend: BACKEND.to_string(),
                    message: format!(
                        "'{}' uses index format {} but {INDEX_FORMAT_VERSION} is required; \
                         re-run ingestion with --rebuild",
                        path.display(),
                        stored.version
                    ),
                });
            }
            debug!(collection = %stored.name, count = stored.chunks.len(), "loaded collection");
            collections.insert(stored.name.clone(), stored);
        }

        info!(dir = %dir.display(), collections = collections.len(), "opened local index");
        Ok(Self {
            dir,
            embedding_model: None,
            deferred: false,
            inner: RwLock::new(Inner { collections, dirty: BTreeSet::new() }),
        })
    }

    /// Record `model` as the embedding model of every collection this store
    /// creates, and refuse to add vectors to a collection recorded under a
    /// different model.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Keep mutations in memory until [`VectorStore::flush`], writing each
    /// changed collection once. Unflushed changes are lost when the store is
    /// dropped.
    pub fn with_deferred_writes(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// The index directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Manifest of a collection, or `None` if it does not exist.
    pub async fn collection_info(&self, name: &str) -> Option<CollectionInfo> {
        self.inner.read().await.collections.get(name).map(StoredCollection::info)
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    async fn persist(&self, collection: &StoredCollection) -> Result<()> {
        let path = self.collection_path(&collection.name);
        let tmp = self.dir.join(format!("{}.json.tmp", collection.name));
        let bytes = serde_json::to_vec(collection)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(collection = %collection.name, count = collection.chunks.len(), "persisted collection");
        Ok(())
    }

    /// Validate with `check`, then `apply` the change. With immediate writes
    /// the change lands in memory only once its file is written.
    async fn modify(
        &self,
        collection: &str,
        check: impl FnOnce(&StoredCollection) -> Result<()>,
        apply: impl FnOnce(&mut StoredCollection),
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let current = inner.collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        check(current)?;

        if self.deferred {
            apply(current);
            current.updated_at = Utc::now();
            inner.dirty.insert(collection.to_string());
            return Ok(());
        }

        let mut next = current.clone();
        apply(&mut next);
        next.updated_at = Utc::now();
        self.persist(&next).await?;
        *current = next;
        Ok(())
    }

    fn check_embedding_model(&self, stored: &StoredCollection) -> Result<()> {
        match (stored.embedding_model.as_deref(), self.embedding_model.as_deref()) {
            (Some(recorded), Some(configured)) if recorded != configured => {
                Err(RagError::VectorStoreError {
                    backend: BACKEND.to_string(),
                    message: format!(
                        "collection '{}' was built with embedding model '{recorded}' but \
                         '{configured}' is configured; re-run ingestion with --rebuild",
                        stored.name
                    ),
                })
            }
            _ => Ok(()),
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(RagError::ConfigError(format!(
            "collection name '{name}' may only contain ASCII letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

fn missing(collection: &str) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        validate_name(name)?;
        let mut inner = self.inner.write().await;
        if inner.collections.contains_key(name) {
            return Ok(());
        }
        let stored = StoredCollection {
            version: INDEX_FORMAT_VERSION,
            name: name.to_string(),
            dimensions,
            embedding_model: self.embedding_model.clone(),
            updated_at: Utc::now(),
            chunks: BTreeMap::new(),
        };
        if self.deferred {
            inner.dirty.insert(name.to_string());
        } else {
            self.persist(&stored).await?;
        }
        inner.collections.insert(name.to_string(), stored);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.collections.remove(name);
        inner.dirty.remove(name);
        match tokio::fs::remove_file(self.collection_path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.inner.read().await.collections.contains_key(name))
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let check = |stored: &StoredCollection| -> Result<()> {
            self.check_embedding_model(stored)?;
            if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != stored.dimensions) {
                return Err(RagError::VectorStoreError {
                    backend: BACKEND.to_string(),
                    message: format!(
                        "chunk '{}' has {} dimensions but collection '{collection}' stores {}",
                        bad.id,
                        bad.embedding.len(),
                        stored.dimensions
                    ),
                });
            }
            Ok(())
        };
        let apply = |stored: &mut StoredCollection| {
            for chunk in chunks {
                stored.chunks.insert(chunk.id.clone(), chunk.clone());
            }
            if stored.embedding_model.is_none() {
                stored.embedding_model.clone_from(&self.embedding_model);
            }
        };
        self.modify(collection, check, apply).await
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        self.modify(
            collection,
            |_| Ok(()),
            |stored| {
                for id in ids {
                    stored.chunks.remove(*id);
                }
            },
        )
        .await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let inner = self.inner.read().await;
        inner.collections.get(collection).map(|c| c.chunks.len()).ok_or_else(|| missing(collection))
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let inner = self.inner.read().await;
        let stored = inner.collections.get(collection).ok_or_else(|| missing(collection))?;
        if stored.chunks.is_empty() {
            return Ok(Vec::new());
        }
        if embedding.len() != stored.dimensions {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!(
                    "query vector has {} dimensions but collection '{collection}' stores {}; \
                     was the index built with a different embedding model?",
                    embedding.len(),
                    stored.dimensions
                ),
            });
        }
        Ok(rank(stored.chunks.values(), embedding, top_k))
    }

    async fn flush(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        let pending: Vec<String> = inner.dirty.iter().cloned().collect();
        for name in pending {
            match inner.collections.get(&name) {
                Some(stored) => self.persist(stored).await?,
                None => warn!(collection = %name, "dirty collection vanished before flush"),
            }
            inner.dirty.remove(&name);
        }
        Ok(())
    }
}
