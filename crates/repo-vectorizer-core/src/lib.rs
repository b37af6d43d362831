//! # Repo Vectorizer Core
//!
//! Runtime-free logic for Repo Vectorizer: data models, the recursive
//! overlapping chunker, namespace resolution, the index store abstraction,
//! and the embedding trait.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. Blocking work (embedding) is expressed as
//! plain synchronous calls; the application crate decides where to run it.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod models;
pub mod namespace;
pub mod store;

pub use error::{Result, RetrievalError};
