//! SQLite-backed [`IndexStore`] implementation.
//!
//! One `collections` row per namespace; one `records` row per embedded
//! chunk, with the vector stored as a little-endian f32 BLOB. Queries load
//! the namespace's vectors and rank them by cosine distance in process.
//! Every write is a single transaction that takes the database write lock
//! before reading anything, so a batch is either fully visible or not at
//! all, and processes sharing the file allocate ids without colliding.

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::path::Path;

use repo_vectorizer_core::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use repo_vectorizer_core::models::{
    record_id, ChunkMetadata, CollectionHandle, CollectionStatus, EmbeddedChunk, IndexRecord,
    NamespaceInfo, SearchResult,
};
use repo_vectorizer_core::store::{batch_dims, ensure_dims, rank_results, IndexStore};
use repo_vectorizer_core::{Result, RetrievalError};

use crate::config::Config;
use crate::{db, migrate};

/// SQLite implementation of the [`IndexStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and ensure the schema exists.
    pub async fn open(config: &Config) -> AnyResult<Self> {
        Self::open_path(&config.db.path).await
    }

    pub async fn open_path(path: &Path) -> AnyResult<Self> {
        let pool = db::connect_path(path).await?;
        migrate::apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn unavailable(e: sqlx::Error) -> RetrievalError {
    RetrievalError::index_unavailable(e.to_string())
}

/// Ensure the collection row exists and return the namespace's vector
/// dimensions, if it holds any records.
///
/// Must be the first statement of a write transaction: the insert takes
/// SQLite's write lock up front, so every later read in the transaction
/// sees state no other connection can change before commit.
async fn claim_namespace(conn: &mut SqliteConnection, namespace: &str) -> Result<Option<usize>> {
    sqlx::query(
        "INSERT INTO collections (name, created_at) VALUES (?, ?) ON CONFLICT(name) DO NOTHING",
    )
    .bind(namespace)
    .bind(chrono::Utc::now().timestamp())
    .execute(&mut *conn)
    .await
    .map_err(unavailable)?;

    let dims: Option<i64> = sqlx::query_scalar("SELECT dims FROM records WHERE namespace = ? LIMIT 1")
        .bind(namespace)
        .fetch_optional(&mut *conn)
        .await
        .map_err(unavailable)?;
    Ok(dims.map(|d| d as usize))
}

async fn allocate_seq(conn: &mut SqliteConnection, namespace: &str) -> Result<i64> {
    sqlx::query_scalar("SELECT COALESCE(MAX(seq) + 1, 0) FROM records WHERE namespace = ?")
        .bind(namespace)
        .fetch_one(&mut *conn)
        .await
        .map_err(unavailable)
}

#[async_trait]
impl IndexStore for SqliteStore {
    async fn get_or_create(&self, namespace: &str) -> Result<CollectionHandle> {
        let now = chrono::Utc::now().timestamp();
        let inserted = sqlx::query(
            "INSERT INTO collections (name, created_at) VALUES (?, ?) ON CONFLICT(name) DO NOTHING",
        )
        .bind(namespace)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?
        .rows_affected();

        let status = if inserted == 1 {
            CollectionStatus::Created
        } else {
            CollectionStatus::Existing
        };

        Ok(CollectionHandle {
            name: namespace.to_string(),
            status,
        })
    }

    async fn upsert(&self, namespace: &str, records: &[IndexRecord]) -> Result<usize> {
        let Some(dims) = batch_dims(records.iter().map(|r| r.vector.len()))? else {
            return Ok(0);
        };

        let mut tx = self.pool.begin().await.map_err(unavailable)?;
        let stored = claim_namespace(&mut *tx, namespace).await?;
        ensure_dims(namespace, stored, dims)?;

        let next_seq = allocate_seq(&mut *tx, namespace).await?;
        for (offset, record) in records.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO records (namespace, id, seq, path, chunk_index, document, embedding, dims)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(namespace, id) DO UPDATE SET
                    path = excluded.path,
                    chunk_index = excluded.chunk_index,
                    document = excluded.document,
                    embedding = excluded.embedding,
                    dims = excluded.dims
                "#,
            )
            .bind(namespace)
            .bind(&record.id)
            .bind(next_seq + offset as i64)
            .bind(&record.metadata.path)
            .bind(record.metadata.chunk_index as i64)
            .bind(&record.document)
            .bind(vec_to_blob(&record.vector))
            .bind(dims as i64)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
        }

        tx.commit().await.map_err(unavailable)?;
        Ok(records.len())
    }

    async fn append(&self, namespace: &str, chunks: &[EmbeddedChunk]) -> Result<Vec<String>> {
        let Some(dims) = batch_dims(chunks.iter().map(|c| c.vector.len()))? else {
            return Ok(Vec::new());
        };

        let mut tx = self.pool.begin().await.map_err(unavailable)?;
        let stored = claim_namespace(&mut *tx, namespace).await?;
        ensure_dims(namespace, stored, dims)?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE namespace = ?")
            .bind(namespace)
            .fetch_one(&mut *tx)
            .await
            .map_err(unavailable)?;
        let next_seq = allocate_seq(&mut *tx, namespace).await?;

        let mut ids = Vec::with_capacity(chunks.len());
        for (offset, chunk) in chunks.iter().enumerate() {
            let id = record_id(namespace, count as usize + offset);
            // No ON CONFLICT: an id that is already taken aborts the batch.
            sqlx::query(
                r#"
                INSERT INTO records (namespace, id, seq, path, chunk_index, document, embedding, dims)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(namespace)
            .bind(&id)
            .bind(next_seq + offset as i64)
            .bind(&chunk.metadata.path)
            .bind(chunk.metadata.chunk_index as i64)
            .bind(&chunk.document)
            .bind(vec_to_blob(&chunk.vector))
            .bind(dims as i64)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
            ids.push(id);
        }

        tx.commit().await.map_err(unavailable)?;
        Ok(ids)
    }

    async fn query(&self, namespace: &str, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let rows = sqlx::query(
            "SELECT path, chunk_index, document, embedding, dims FROM records WHERE namespace = ? ORDER BY seq ASC",
        )
        .bind(namespace)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        if let Some(row) = rows.first() {
            let stored: i64 = row.get("dims");
            ensure_dims(namespace, Some(stored as usize), vector.len())?;
        }

        let results = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let chunk_index: i64 = row.get("chunk_index");
                SearchResult {
                    document: row.get("document"),
                    metadata: ChunkMetadata {
                        path: row.get("path"),
                        chunk_index: chunk_index as usize,
                    },
                    distance: cosine_distance(vector, &blob_to_vec(&blob)),
                }
            })
            .collect();

        Ok(rank_results(results, k))
    }

    async fn record_count(&self, namespace: &str) -> Result<Option<usize>> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM records WHERE namespace = c.name) FROM collections c WHERE c.name = ?",
        )
        .bind(namespace)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(count.map(|c| c as usize))
    }

    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT c.name AS name, COUNT(r.id) AS records
            FROM collections c
            LEFT JOIN records r ON r.namespace = c.name
            GROUP BY c.name
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(rows
            .iter()
            .map(|row| {
                let records: i64 = row.get("records");
                NamespaceInfo {
                    name: row.get("name"),
                    records: records as usize,
                }
            })
            .collect())
    }
}
