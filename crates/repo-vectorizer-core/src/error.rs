//! Error taxonomy shared by every component.
//!
//! A namespace that does not exist is never an error: search returns an
//! empty result set and ingest creates the namespace.

use thiserror::Error;

/// Errors surfaced by the chunker, embedder, store, and retrieval engine.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Empty or malformed caller input, rejected before any side effect.
    #[error("validation error: {0}")]
    Validation(String),

    /// The embedding capability failed or returned mismatched output.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The persistence layer could not be reached or rejected a write.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    /// Invalid static configuration (chunk sizes, embedding dims).
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RetrievalError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn index_unavailable(msg: impl Into<String>) -> Self {
        Self::IndexUnavailable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
