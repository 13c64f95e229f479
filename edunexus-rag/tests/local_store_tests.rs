//! Persistence tests for the file-backed vector store.

use std::collections::HashMap;

use edunexus_rag::local::INDEX_FORMAT_VERSION;
use edunexus_rag::{Chunk, LocalVectorStore, VectorStore};
use tempfile::TempDir;

fn chunk(id: &str, text: &str, embedding: Vec<f32>) -> Chunk {
    Chunk {
        id: id.to_string(),
        text: text.to_string(),
        embedding,
        metadata: HashMap::from([("page".to_string(), "1".to_string())]),
        document_id: "physics".to_string(),
    }
}

#[tokio::test]
async fn collections_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = LocalVectorStore::open(dir.path()).await.unwrap().with_embedding_model("test/model");
        store.create_collection("textbooks", 3).await.unwrap();
        store
            .upsert(
                "textbooks",
                &[
                    chunk("physics_0", "force equals mass times acceleration", vec![1.0, 0.0, 0.0]),
                    chunk("physics_1", "energy is conserved", vec![0.0, 1.0, 0.0]),
                ],
            )
            .await
            .unwrap();
    }

    let reopened = LocalVectorStore::open(dir.path()).await.unwrap();
    assert!(reopened.has_collection("textbooks").await.unwrap());
    assert_eq!(reopened.count("textbooks").await.unwrap(), 2);

    let info = reopened.collection_info("textbooks").await.unwrap();
    assert_eq!(info.dimensions, 3);
    assert_eq!(info.embedding_model.as_deref(), Some("test/model"));
    assert_eq!(info.count, 2);

    let results = reopened.search("textbooks", &[0.9, 0.1, 0.0], 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.id, "physics_0");
    assert_eq!(results[0].chunk.metadata.get("page").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn upsert_replaces_chunks_with_the_same_id() {
    let dir = TempDir::new().unwrap();
    let store = LocalVectorStore::open(dir.path()).await.unwrap();
    store.create_collection("c", 2).await.unwrap();
    store.upsert("c", &[chunk("a", "old", vec![1.0, 0.0])]).await.unwrap();
    store.upsert("c", &[chunk("a", "new", vec![0.0, 1.0])]).await.unwrap();

    assert_eq!(store.count("c").await.unwrap(), 1);
    let results = store.search("c", &[0.0, 1.0], 3).await.unwrap();
    assert_eq!(results[0].chunk.text, "new");
}

#[tokio::test]
async fn dimension_mismatch_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = LocalVectorStore::open(dir.path()).await.unwrap();
    store.create_collection("c", 3).await.unwrap();

    assert!(store.upsert("c", &[chunk("a", "x", vec![1.0, 0.0])]).await.is_err());
    assert_eq!(store.count("c").await.unwrap(), 0);

    store.upsert("c", &[chunk("b", "y", vec![1.0, 0.0, 0.0])]).await.unwrap();
    assert!(store.search("c", &[1.0, 0.0], 1).await.is_err());
}

#[tokio::test]
async fn empty_collection_persists_and_searches_to_nothing() {
    let dir = TempDir::new().unwrap();
    LocalVectorStore::open(dir.path()).await.unwrap().create_collection("empty", 4).await.unwrap();

    let store = LocalVectorStore::open(dir.path()).await.unwrap();
    assert_eq!(store.count("empty").await.unwrap(), 0);
    assert!(store.search("empty", &[1.0, 0.0, 0.0, 0.0], 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_collection_removes_the_file() {
    let dir = TempDir::new().unwrap();
    let store = LocalVectorStore::open(dir.path()).await.unwrap();
    store.create_collection("gone", 2).await.unwrap();
    assert!(dir.path().join("gone.json").exists());

    store.delete_collection("gone").await.unwrap();
    assert!(!dir.path().join("gone.json").exists());
    assert!(!store.has_collection("gone").await.unwrap());

    // Deleting again is not an error.
    store.delete_collection("gone").await.unwrap();
}

#[tokio::test]
async fn unknown_format_version_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let store = LocalVectorStore::open(dir.path()).await.unwrap();
    store.create_collection("old", 2).await.unwrap();
    drop(store);

    let path = dir.path().join("old.json");
    let mut value: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    value["version"] = serde_json::json!(INDEX_FORMAT_VERSION + 1);
    std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

    assert!(LocalVectorStore::open(dir.path()).await.is_err());
}

#[tokio::test]
async fn invalid_collection_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = LocalVectorStore::open(dir.path()).await.unwrap();
    assert!(store.create_collection("../escape", 2).await.is_err());
}

#[tokio::test]
async fn upsert_under_another_embedding_model_is_refused() {
    let dir = TempDir::new().unwrap();
    {
        let store = LocalVectorStore::open(dir.path()).await.unwrap().with_embedding_model("model-A");
        store.create_collection("textbooks", 2).await.unwrap();
        store.upsert("textbooks", &[chunk("a", "atoms", vec![1.0, 0.0])]).await.unwrap();
    }

    let store = LocalVectorStore::open(dir.path()).await.unwrap().with_embedding_model("model-B");
    let err = store.upsert("textbooks", &[chunk("b", "cells", vec![0.0, 1.0])]).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("model-A"), "{message}");
    assert!(message.contains("--rebuild"), "{message}");

    let info = store.collection_info("textbooks").await.unwrap();
    assert_eq!(info.embedding_model.as_deref(), Some("model-A"));
    assert_eq!(info.count, 1);

    let reopened = LocalVectorStore::open(dir.path()).await.unwrap();
    let info = reopened.collection_info("textbooks").await.unwrap();
    assert_eq!(info.embedding_model.as_deref(), Some("model-A"));
    assert_eq!(info.count, 1);
}

#[tokio::test]
async fn failed_write_leaves_the_collection_unchanged() {
    let dir = TempDir::new().unwrap();
    let index = dir.path().join("index");
    let store = LocalVectorStore::open(&index).await.unwrap();
    store.create_collection("c", 2).await.unwrap();
    store.upsert("c", &[chunk("a", "kept", vec![1.0, 0.0])]).await.unwrap();

    std::fs::remove_dir_all(&index).unwrap();
    assert!(store.upsert("c", &[chunk("b", "lost", vec![0.0, 1.0])]).await.is_err());

    assert_eq!(store.count("c").await.unwrap(), 1);
    let results = store.search("c", &[0.0, 1.0], 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.id, "a");
}

#[tokio::test]
async fn deferred_writes_reach_disk_on_flush() {
    let dir = TempDir::new().unwrap();
    let store = LocalVectorStore::open(dir.path()).await.unwrap().with_deferred_writes();
    store.create_collection("c", 2).await.unwrap();
    for i in 0..5 {
        store.upsert("c", &[chunk(&format!("c_{i}"), "text", vec![1.0, i as f32])]).await.unwrap();
    }
    assert_eq!(store.count("c").await.unwrap(), 5);
    assert!(!dir.path().join("c.json").exists());

    store.flush().await.unwrap();

    let reopened = LocalVectorStore::open(dir.path()).await.unwrap();
    assert_eq!(reopened.count("c").await.unwrap(), 5);
}

#[tokio::test]
async fn deleted_collection_is_not_written_by_flush() {
    let dir = TempDir::new().unwrap();
    let store = LocalVectorStore::open(dir.path()).await.unwrap().with_deferred_writes();
    store.create_collection("c", 2).await.unwrap();
    store.upsert("c", &[chunk("a", "text", vec![1.0, 0.0])]).await.unwrap();
    store.delete_collection("c").await.unwrap();

    store.flush().await.unwrap();

    assert!(!dir.path().join("c.json").exists());
    assert!(!LocalVectorStore::open(dir.path()).await.unwrap().has_collection("c").await.unwrap());
}
