//! Retrieval engine: the ingest and search pipelines.
//!
//! # Ingest
//!
//! ```text
//! files ──► TextSplitter ──► Embedder (one batch) ──► IndexStore::append
//!            (path, chunk_index)   spawn_blocking        ids allocated atomically
//! ```
//!
//! # Search
//!
//! ```text
//! query ──► Embedder::embed_one ──► IndexStore::query ──► ranked results
//! ```
//!
//! Embedding is CPU-bound and blocking, so it runs on tokio's blocking pool,
//! bounded by a semaphore sized from `embedding.max_concurrent`. The store
//! allocates ids and writes the batch as one step, which keeps concurrent
//! ingests into one namespace apart even across processes sharing the
//! index.
//!
//! # Record ids
//!
//! Ids are positional: `"{namespace}_{n}"` where `n` continues from the
//! namespace's current record count. Re-ingesting an unchanged file appends
//! a second copy of its chunks instead of replacing the first. Whether
//! re-ingestion should instead replace prior records for the same path is
//! an open question; no dedup strategy is applied here.

use std::sync::Arc;

use tokio::sync::Semaphore;

use repo_vectorizer_core::chunk::TextSplitter;
use repo_vectorizer_core::embedding::{check_embeddings, Embedder};
use repo_vectorizer_core::models::{
    ChunkMetadata, EmbeddedChunk, FileRecord, IngestResult, NamespaceInfo, SearchResult,
};
use repo_vectorizer_core::namespace::resolve_namespace;
use repo_vectorizer_core::store::IndexStore;
use repo_vectorizer_core::{Result, RetrievalError};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::sqlite_store::SqliteStore;

const DEFAULT_K: usize = 3;
const DEFAULT_MAX_K: usize = 100;
const DEFAULT_MAX_CONCURRENT: usize = 2;

/// Orchestrates chunking, embedding, and the index store.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct RetrievalEngine {
    store: Arc<dyn IndexStore>,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    default_k: usize,
    max_k: usize,
    embed_permits: Arc<Semaphore>,
}

impl RetrievalEngine {
    pub fn new(
        store: Arc<dyn IndexStore>,
        embedder: Arc<dyn Embedder>,
        splitter: TextSplitter,
    ) -> Self {
        Self {
            store,
            embedder,
            splitter,
            default_k: DEFAULT_K,
            max_k: DEFAULT_MAX_K,
            embed_permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT)),
        }
    }

    /// Build an engine from a validated [`Config`].
    pub fn from_config(
        config: &Config,
        store: Arc<dyn IndexStore>,
        embedder: Arc<dyn Embedder>,
    ) -> anyhow::Result<Self> {
        let splitter = config.chunking.splitter()?;
        Ok(Self::new(store, embedder, splitter)
            .with_k_limits(config.retrieval.default_k, config.retrieval.max_k)
            .with_max_concurrent(config.embedding.max_concurrent))
    }

    pub fn with_k_limits(mut self, default_k: usize, max_k: usize) -> Self {
        self.default_k = default_k.max(1);
        self.max_k = max_k.max(self.default_k);
        self
    }

    pub fn with_max_concurrent(mut self, permits: usize) -> Self {
        self.embed_permits = Arc::new(Semaphore::new(permits.max(1)));
        self
    }

    /// Chunk, embed, and store `files` under the namespace for `repo_identifier`.
    ///
    /// Returns [`IngestStatus::NoChunks`](repo_vectorizer_core::models::IngestStatus::NoChunks)
    /// without touching the store when `files` is empty or every file is
    /// whitespace. On an embedding failure nothing is written.
    pub async fn ingest(&self, repo_identifier: &str, files: &[FileRecord]) -> Result<IngestResult> {
        let namespace = resolve_namespace(repo_identifier)?;
        if files.iter().any(|f| f.path.trim().is_empty()) {
            return Err(RetrievalError::validation("file path must not be empty"));
        }

        let chunks: Vec<_> = files
            .iter()
            .flat_map(|file| self.splitter.chunk_file(file))
            .collect();

        if chunks.is_empty() {
            tracing::debug!(namespace = %namespace, files = files.len(), "no chunks to ingest");
            return Ok(IngestResult::no_chunks(namespace));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embed_blocking(texts).await?;
        check_embeddings(chunks.len(), self.embedder.dims(), &vectors)?;

        self.store.get_or_create(&namespace).await?;

        let batch: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk {
                vector,
                document: chunk.text,
                metadata: ChunkMetadata {
                    path: chunk.path,
                    chunk_index: chunk.chunk_index,
                },
            })
            .collect();

        let added = self.store.append(&namespace, &batch).await?.len();

        tracing::info!(
            namespace = %namespace,
            files = files.len(),
            chunks = added,
            "ingested"
        );
        Ok(IngestResult::success(namespace, added))
    }

    /// Return up to `k` chunks nearest to `query` (default `default_k`,
    /// clamped to `max_k`).
    ///
    /// An unknown namespace yields an empty list and no embedding call.
    pub async fn search(
        &self,
        repo_identifier: &str,
        query: &str,
        k: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let namespace = resolve_namespace(repo_identifier)?;

        if query.trim().is_empty() {
            return Err(RetrievalError::validation("query must not be empty"));
        }
        let k = k.unwrap_or(self.default_k);
        if k == 0 {
            return Err(RetrievalError::validation("k must be >= 1"));
        }
        let k = k.min(self.max_k);

        if self.store.record_count(&namespace).await?.is_none() {
            tracing::debug!(namespace = %namespace, "search on unknown namespace");
            return Ok(Vec::new());
        }

        let vector = self
            .embed_blocking(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::embedding("Empty embedding response"))?;

        let results = self.store.query(&namespace, &vector, k).await?;
        tracing::debug!(namespace = %namespace, k, hits = results.len(), "search");
        Ok(results)
    }

    pub async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        self.store.list_namespaces().await
    }

    async fn embed_blocking(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let _permit = self
            .embed_permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| RetrievalError::embedding(format!("embedding pool closed: {}", e)))?;

        let embedder = Arc::clone(&self.embedder);
        tokio::task::spawn_blocking(move || embedder.embed(&texts))
            .await
            .map_err(|e| RetrievalError::embedding(format!("embedding task failed: {}", e)))?
    }

}

/// Open the configured SQLite index and embedder and build an engine over them.
pub async fn open_engine(config: &Config) -> anyhow::Result<RetrievalEngine> {
    let store = SqliteStore::open(config).await?;
    let embedder = create_embedder(&config.embedding)?;
    tracing::debug!(
        db = %config.db.path.display(),
        model = embedder.model_name(),
        dims = embedder.dims(),
        "opened engine"
    );
    RetrievalEngine::from_config(config, Arc::new(store), embedder)
}
