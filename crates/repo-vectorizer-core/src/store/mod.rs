//! Index store abstraction.
//!
//! The [`IndexStore`] trait is the contract between the retrieval engine
//! and a durable vector index partitioned by namespace. Implementations
//! must be `Send + Sync` to work with async runtimes.
//!
//! # Distance
//!
//! All stores rank by cosine distance
//! ([`cosine_distance`](crate::embedding::cosine_distance)); results are
//! returned nearest first.
//!
//! # Dimensions
//!
//! A namespace holds vectors of one length only. The first write fixes it;
//! later writes and queries with another length fail with
//! [`RetrievalError::Config`].

pub mod memory;

use async_trait::async_trait;

use crate::error::{Result, RetrievalError};
use crate::models::{CollectionHandle, EmbeddedChunk, IndexRecord, NamespaceInfo, SearchResult};

/// Durable, per-namespace collection of embedded chunks.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_or_create`](IndexStore::get_or_create) | Idempotently create a namespace |
/// | [`upsert`](IndexStore::upsert) | Insert-or-replace a batch of records |
/// | [`append`](IndexStore::append) | Add a batch under freshly allocated ids |
/// | [`query`](IndexStore::query) | k-nearest lookup within one namespace |
/// | [`record_count`](IndexStore::record_count) | Size of a namespace, `None` if absent |
/// | [`list_namespaces`](IndexStore::list_namespaces) | All namespaces with sizes |
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Return the namespace, creating it if needed.
    ///
    /// Never fails because the namespace already exists.
    async fn get_or_create(&self, namespace: &str) -> Result<CollectionHandle>;

    /// Write all `records` to `namespace` as one atomic batch and return how
    /// many were written.
    ///
    /// An empty slice returns `0` and has no side effects; in particular it
    /// does not create the namespace. Records are replaced by id. The batch
    /// is durable when this returns.
    async fn upsert(&self, namespace: &str, records: &[IndexRecord]) -> Result<usize>;

    /// Append `chunks` to `namespace` and return their ids in input order.
    ///
    /// Ids are [`record_id`](crate::models::record_id)`(namespace, n)` with
    /// `n` continuing from the namespace's record count. Reading the count
    /// and writing the batch is one atomic step, so concurrent appends to
    /// the same namespace, from this process or another one sharing the
    /// index, never reuse an id. An id that already exists fails the whole
    /// batch instead of replacing the stored record.
    ///
    /// An empty slice returns no ids and has no side effects.
    async fn append(&self, namespace: &str, chunks: &[EmbeddedChunk]) -> Result<Vec<String>>;

    /// Return at most `k` records nearest to `vector`, ascending by distance.
    ///
    /// An unknown namespace yields an empty result, not an error.
    async fn query(&self, namespace: &str, vector: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    async fn record_count(&self, namespace: &str) -> Result<Option<usize>>;

    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>>;
}

/// Sort `results` nearest first and keep the best `k`.
pub fn rank_results(mut results: Vec<SearchResult>, k: usize) -> Vec<SearchResult> {
    results.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(k);
    results
}

/// The common length of `lengths`, or `None` when there are none.
///
/// # Errors
///
/// Returns [`RetrievalError::Config`] if the batch mixes vector lengths.
pub fn batch_dims(lengths: impl IntoIterator<Item = usize>) -> Result<Option<usize>> {
    let mut dims = None;
    for len in lengths {
        match dims {
            None => dims = Some(len),
            Some(d) if d != len => {
                return Err(RetrievalError::config(format!(
                    "batch mixes {}-dimensional and {}-dimensional vectors",
                    d, len
                )))
            }
            Some(_) => {}
        }
    }
    Ok(dims)
}

/// Fail unless `incoming` matches the dimensions `namespace` already holds.
pub fn ensure_dims(namespace: &str, stored: Option<usize>, incoming: usize) -> Result<()> {
    match stored {
        Some(stored) if stored != incoming => Err(RetrievalError::config(format!(
            "namespace '{}' holds {}-dimensional vectors, got {}; re-index it with the current embedder",
            namespace, stored, incoming
        ))),
        _ => Ok(()),
    }
}
