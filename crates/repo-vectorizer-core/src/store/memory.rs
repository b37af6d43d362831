//! In-memory [`IndexStore`] implementation for tests and embedding in
//! other hosts.
//!
//! Uses a `HashMap` of namespaces behind `std::sync::RwLock`. Query is
//! brute-force cosine distance over the namespace. Nothing is persisted.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::error::{Result, RetrievalError};
use crate::models::{
    record_id, ChunkMetadata, CollectionHandle, CollectionStatus, EmbeddedChunk, IndexRecord,
    NamespaceInfo, SearchResult,
};

use super::{batch_dims, ensure_dims, rank_results, IndexStore};

struct StoredRecord {
    id: String,
    vector: Vec<f32>,
    document: String,
    metadata: ChunkMetadata,
}

#[derive(Default)]
struct Collection {
    records: Vec<StoredRecord>,
}

impl Collection {
    fn dims(&self) -> Option<usize> {
        self.records.first().map(|r| r.vector.len())
    }
}

/// Volatile store keyed by namespace.
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> RetrievalError {
    RetrievalError::index_unavailable(format!("in-memory store lock poisoned: {}", e))
}

#[async_trait]
impl IndexStore for InMemoryStore {
    async fn get_or_create(&self, namespace: &str) -> Result<CollectionHandle> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let status = if collections.contains_key(namespace) {
            CollectionStatus::Existing
        } else {
            collections.insert(namespace.to_string(), Collection::default());
            CollectionStatus::Created
        };
        Ok(CollectionHandle {
            name: namespace.to_string(),
            status,
        })
    }

    async fn upsert(&self, namespace: &str, records: &[IndexRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let Some(dims) = batch_dims(records.iter().map(|r| r.vector.len()))? else {
            return Ok(0);
        };
        let mut collections = self.collections.write().map_err(poisoned)?;
        let collection = collections.entry(namespace.to_string()).or_default();
        ensure_dims(namespace, collection.dims(), dims)?;
        for record in records {
            collection.records.retain(|r| r.id != record.id);
            collection.records.push(StoredRecord {
                id: record.id.clone(),
                vector: record.vector.clone(),
                document: record.document.clone(),
                metadata: record.metadata.clone(),
            });
        }
        Ok(records.len())
    }

    async fn append(&self, namespace: &str, chunks: &[EmbeddedChunk]) -> Result<Vec<String>> {
        let Some(dims) = batch_dims(chunks.iter().map(|c| c.vector.len()))? else {
            return Ok(Vec::new());
        };
        let mut collections = self.collections.write().map_err(poisoned)?;
        let collection = collections.entry(namespace.to_string()).or_default();
        ensure_dims(namespace, collection.dims(), dims)?;

        let start = collection.records.len();
        let ids: Vec<String> = (start..start + chunks.len())
            .map(|n| record_id(namespace, n))
            .collect();
        if let Some(taken) = ids
            .iter()
            .find(|id| collection.records.iter().any(|r| &r.id == *id))
        {
            return Err(RetrievalError::index_unavailable(format!(
                "record id '{}' is already taken",
                taken
            )));
        }

        for (id, chunk) in ids.iter().zip(chunks) {
            collection.records.push(StoredRecord {
                id: id.clone(),
                vector: chunk.vector.clone(),
                document: chunk.document.clone(),
                metadata: chunk.metadata.clone(),
            });
        }
        Ok(ids)
    }

    async fn query(&self, namespace: &str, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().map_err(poisoned)?;
        let Some(collection) = collections.get(namespace) else {
            return Ok(Vec::new());
        };
        ensure_dims(namespace, collection.dims(), vector.len())?;
        let results = collection
            .records
            .iter()
            .map(|r| SearchResult {
                document: r.document.clone(),
                metadata: r.metadata.clone(),
                distance: cosine_distance(vector, &r.vector),
            })
            .collect();
        Ok(rank_results(results, k))
    }

    async fn record_count(&self, namespace: &str) -> Result<Option<usize>> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections.get(namespace).map(|c| c.records.len()))
    }

    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        let collections = self.collections.read().map_err(poisoned)?;
        let mut out: Vec<NamespaceInfo> = collections
            .iter()
            .map(|(name, c)| NamespaceInfo {
                name: name.clone(),
                records: c.records.len(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record_id;

    fn record(ns: &str, seq: usize, vector: Vec<f32>, path: &str) -> IndexRecord {
        IndexRecord {
            id: record_id(ns, seq),
            vector,
            document: format!("doc {}", seq),
            metadata: ChunkMetadata {
                path: path.to_string(),
                chunk_index: seq,
            },
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_tagged_and_idempotent() {
        let store = InMemoryStore::new();
        let first = store.get_or_create("demo").await.unwrap();
        let second = store.get_or_create("demo").await.unwrap();
        assert_eq!(first.status, CollectionStatus::Created);
        assert_eq!(second.status, CollectionStatus::Existing);
        assert_eq!(store.record_count("demo").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_empty_upsert_creates_nothing() {
        let store = InMemoryStore::new();
        assert_eq!(store.upsert("ghost", &[]).await.unwrap(), 0);
        assert_eq!(store.record_count("ghost").await.unwrap(), None);
        assert!(store.list_namespaces().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_orders_by_distance_and_limits() {
        let store = InMemoryStore::new();
        let records = vec![
            record("demo", 0, vec![1.0, 0.0], "a.rs"),
            record("demo", 1, vec![0.0, 1.0], "b.rs"),
            record("demo", 2, vec![0.7, 0.7], "c.rs"),
        ];
        assert_eq!(store.upsert("demo", &records).await.unwrap(), 3);

        let results = store.query("demo", &[1.0, 0.1], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metadata.path, "a.rs");
        assert_eq!(results[1].metadata.path, "c.rs");
        assert!(results[0].distance <= results[1].distance);
    }

    #[tokio::test]
    async fn test_query_unknown_namespace_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.query("nope", &[1.0], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = InMemoryStore::new();
        store
            .upsert("demo", &[record("demo", 0, vec![1.0, 0.0], "old.rs")])
            .await
            .unwrap();
        store
            .upsert("demo", &[record("demo", 0, vec![1.0, 0.0], "new.rs")])
            .await
            .unwrap();
        assert_eq!(store.record_count("demo").await.unwrap(), Some(1));
        let results = store.query("demo", &[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results[0].metadata.path, "new.rs");
    }

    fn embedded(vector: Vec<f32>, path: &str) -> EmbeddedChunk {
        EmbeddedChunk {
            vector,
            document: format!("body of {}", path),
            metadata: ChunkMetadata {
                path: path.to_string(),
                chunk_index: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_append_allocates_contiguous_ids() {
        let store = InMemoryStore::new();
        assert!(store.append("demo", &[]).await.unwrap().is_empty());
        assert_eq!(store.record_count("demo").await.unwrap(), None);

        let first = store
            .append("demo", &[embedded(vec![1.0, 0.0], "a.rs"), embedded(vec![0.0, 1.0], "b.rs")])
            .await
            .unwrap();
        let second = store
            .append("demo", &[embedded(vec![0.5, 0.5], "c.rs")])
            .await
            .unwrap();
        assert_eq!(first, vec!["demo_0", "demo_1"]);
        assert_eq!(second, vec!["demo_2"]);
        assert_eq!(store.record_count("demo").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_append_never_overwrites_an_existing_id() {
        let store = InMemoryStore::new();
        store
            .upsert("demo", &[record("demo", 1, vec![1.0, 0.0], "kept.rs")])
            .await
            .unwrap();

        let err = store
            .append("demo", &[embedded(vec![0.0, 1.0], "a.rs"), embedded(vec![0.0, 1.0], "b.rs")])
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::IndexUnavailable(_)));
        assert_eq!(store.record_count("demo").await.unwrap(), Some(1));
        let results = store.query("demo", &[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results[0].metadata.path, "kept.rs");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let store = InMemoryStore::new();
        store
            .append("demo", &[embedded(vec![1.0, 0.0, 0.0], "a.rs")])
            .await
            .unwrap();

        let err = store
            .append("demo", &[embedded(vec![1.0, 0.0], "b.rs")])
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Config(_)));
        let err = store
            .upsert("demo", &[record("demo", 9, vec![1.0, 0.0], "c.rs")])
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Config(_)));
        assert!(store.query("demo", &[1.0, 0.0], 3).await.is_err());

        assert_eq!(store.record_count("demo").await.unwrap(), Some(1));
        assert_eq!(store.query("demo", &[1.0, 0.0, 0.0], 3).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = InMemoryStore::new();
        store
            .upsert("a", &[record("a", 0, vec![1.0, 0.0], "only-in-a.rs")])
            .await
            .unwrap();
        store.get_or_create("b").await.unwrap();
        assert!(store.query("b", &[1.0, 0.0], 10).await.unwrap().is_empty());

        let names: Vec<String> = store
            .list_namespaces()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
