//! Core data models that flow through ingestion and retrieval.

use serde::{Deserialize, Serialize};

/// One source file handed to the engine by a connector or the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A bounded text segment of one file, tagged with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub path: String,
    pub chunk_index: usize,
}

/// Metadata stored with every record and echoed back in results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub path: String,
    pub chunk_index: usize,
}

/// A fully embedded chunk ready to be written to an index store.
#[derive(Debug, Clone)]
pub struct IndexRecord {
    /// `"{namespace}_{sequence}"`, see [`record_id`].
    pub id: String,
    pub vector: Vec<f32>,
    pub document: String,
    pub metadata: ChunkMetadata,
}

/// An embedded chunk that has not been assigned an id yet.
///
/// [`IndexStore::append`](crate::store::IndexStore::append) allocates the
/// positional id when the chunk is written.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub vector: Vec<f32>,
    pub document: String,
    pub metadata: ChunkMetadata,
}

/// One ranked hit from a k-nearest query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance (`1 - cosine_similarity`); lower is nearer.
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Success,
    NoChunks,
}

/// Outcome of one ingest call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub status: IngestStatus,
    pub namespace: String,
    pub chunks_added: usize,
}

impl IngestResult {
    pub fn no_chunks(namespace: impl Into<String>) -> Self {
        Self {
            status: IngestStatus::NoChunks,
            namespace: namespace.into(),
            chunks_added: 0,
        }
    }

    pub fn success(namespace: impl Into<String>, chunks_added: usize) -> Self {
        Self {
            status: IngestStatus::Success,
            namespace: namespace.into(),
            chunks_added,
        }
    }
}

/// Whether [`get_or_create`](crate::store::IndexStore::get_or_create)
/// made a new collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Created,
    Existing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHandle {
    pub name: String,
    pub status: CollectionStatus,
}

/// Namespace listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceInfo {
    pub name: String,
    pub records: usize,
}

/// Deterministic record id for the `sequence`-th record of a namespace.
///
/// Ids are positional, not content-derived: ingesting an unchanged file a
/// second time allocates fresh sequence numbers and appends new records.
pub fn record_id(namespace: &str, sequence: usize) -> String {
    format!("{}_{}", namespace, sequence)
}
