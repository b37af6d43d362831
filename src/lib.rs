//! # Repo Vectorizer
//!
//! Chunk, embed, and semantically search source repositories, one isolated
//! index namespace per repository.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │ Connectors  │──▶│ RetrievalEngine  │──▶│ SqliteStore  │
//! │  FS / Git   │   │ chunk + embed    │   │ per-namespace│
//! └─────────────┘   └────────┬─────────┘   └──────────────┘
//!                            │
//!                  ┌─────────┴─────────┐
//!                  ▼                   ▼
//!             ┌──────────┐       ┌──────────┐
//!             │   CLI    │       │   HTTP   │
//!             │  (rvec)  │       │  (axum)  │
//!             └──────────┘       └──────────┘
//! ```
//!
//! Chunking, the embedder trait, namespace resolution, and the store trait
//! live in `repo-vectorizer-core`; this crate adds persistence, the model
//! backend, repository acquisition, and the outer surfaces.
//!
//! ## Quick Start
//!
//! ```bash
//! rvec init
//! rvec ingest ./my-service --repo org/my-service
//! rvec search org/my-service "where are retries configured"
//! rvec serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite index store |
//! | [`embedding`] | Embedding providers (fastembed, hashing, disabled) |
//! | [`engine`] | Ingest and search pipelines |
//! | [`connector_fs`] | Directory scanning |
//! | [`connector_git`] | Clone/update and analyze git repositories |
//! | [`ingest`] | `rvec ingest` / `rvec analyze` |
//! | [`search`] | `rvec search` / `rvec namespaces` |
//! | [`server`] | HTTP server |

pub mod config;
pub mod connector_fs;
pub mod connector_git;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod ingest;
pub mod migrate;
pub mod search;
pub mod server;
pub mod sqlite_store;
