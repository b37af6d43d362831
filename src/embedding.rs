//! Embedding providers for the application crate.
//!
//! The [`Embedder`] trait, the offline [`HashingEmbedder`], and the vector
//! utilities live in `repo-vectorizer-core`. This module adds:
//! - **[`DisabledEmbedder`]**: fails every call; used when embeddings are not configured.
//! - **[`LocalEmbedder`]**: runs models locally via fastembed; no network calls after model download.
//!
//! # Provider Selection
//!
//! Use [`create_embedder`] to instantiate the provider named in config:
//!
//! ```rust,no_run
//! # use repo_vectorizer::config::EmbeddingConfig;
//! # use repo_vectorizer::embedding::create_embedder;
//! let config = EmbeddingConfig {
//!     provider: "disabled".to_string(),
//!     ..EmbeddingConfig::default()
//! };
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "disabled");
//! ```

use anyhow::{bail, Result};
use std::sync::Arc;

pub use repo_vectorizer_core::embedding::{
    blob_to_vec, check_embeddings, cosine_distance, cosine_similarity, vec_to_blob, Embedder,
    HashingEmbedder,
};
use repo_vectorizer_core::RetrievalError;

use crate::config::EmbeddingConfig;

/// Embedder used when `embedding.provider = "disabled"`.
pub struct DisabledEmbedder;

impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        0
    }

    fn embed(&self, _texts: &[String]) -> repo_vectorizer_core::Result<Vec<Vec<f32>>> {
        Err(RetrievalError::embedding(
            "embeddings are disabled (set [embedding] provider in config)",
        ))
    }
}

/// Resolve the configured model name and its output dimensionality.
fn resolve_local_model(config: &EmbeddingConfig) -> (String, usize) {
    let model_name = config
        .model
        .clone()
        .unwrap_or_else(|| "all-minilm-l6-v2".to_string());

    let dims = config.dims.unwrap_or(match model_name.as_str() {
        "all-minilm-l6-v2" => 384,
        "bge-small-en-v1.5" => 384,
        "bge-base-en-v1.5" => 768,
        "bge-large-en-v1.5" => 1024,
        "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => 768,
        _ => 384,
    });

    (model_name, dims)
}

#[cfg(feature = "local-embeddings-fastembed")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5",
            other
        ),
    }
}

/// Local ONNX inference through fastembed.
///
/// The model is downloaded (first run only) and loaded on the first
/// [`embed`](Embedder::embed) call, then kept for the lifetime of this
/// value. Construction is cheap, so a process that never embeds never pays
/// for model load. Dropping the embedder releases the model.
#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    batch_size: usize,
    fastembed_model: fastembed::EmbeddingModel,
    model: std::sync::Mutex<Option<fastembed::TextEmbedding>>,
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model_name, dims) = resolve_local_model(config);
        let fastembed_model = config_to_fastembed_model(&model_name)?;
        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size,
            fastembed_model,
            model: std::sync::Mutex::new(None),
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.model.lock().map(|m| m.is_some()).unwrap_or(false)
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn embed(&self, texts: &[String]) -> repo_vectorizer_core::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(RetrievalError::embedding("cannot embed an empty batch"));
        }

        let mut slot = self
            .model
            .lock()
            .map_err(|e| RetrievalError::embedding(format!("embedding model lock poisoned: {}", e)))?;

        if slot.is_none() {
            tracing::info!(model = %self.model_name, "loading local embedding model");
            let loaded = fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(self.fastembed_model.clone())
                    .with_show_download_progress(true),
            )
            .map_err(|e| {
                RetrievalError::embedding(format!(
                    "Failed to initialize local embedding model: {}",
                    e
                ))
            })?;
            *slot = Some(loaded);
        }

        let model = slot
            .as_mut()
            .ok_or_else(|| RetrievalError::embedding("local embedding model not loaded"))?;

        let vectors = model
            .embed(texts.to_vec(), Some(self.batch_size))
            .map_err(|e| RetrievalError::embedding(format!("Local embedding failed: {}", e)))?;

        check_embeddings(texts.len(), self.dims, &vectors)?;
        Ok(vectors)
    }
}

/// Create the [`Embedder`] named by `config.provider`.
///
/// | Config Value | Embedder |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"hashing"` | [`HashingEmbedder`] with `embedding.dims` buckets |
/// | `"local"` | `LocalEmbedder` (requires the `local-embeddings-fastembed` feature) |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "hashing" => {
            let dims = config.dims.unwrap_or(0);
            Ok(Arc::new(HashingEmbedder::new(dims)?))
        }
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!(
            "Local embedding provider requires --features local-embeddings-fastembed"
        ),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, dims: Option<usize>) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: provider.to_string(),
            dims,
            ..EmbeddingConfig::default()
        }
    }

    #[test]
    fn test_disabled_embedder_always_fails() {
        let embedder = create_embedder(&config("disabled", None)).unwrap();
        assert_eq!(embedder.model_name(), "disabled");
        let err = embedder.embed(&["hello".to_string()]).unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
    }

    #[test]
    fn test_hashing_embedder_uses_configured_dims() {
        let embedder = create_embedder(&config("hashing", Some(64))).unwrap();
        assert_eq!(embedder.model_name(), "hashing");
        assert_eq!(embedder.dims(), 64);
        let vectors = embedder
            .embed(&["fn main() {}".to_string(), "struct Point".to_string()])
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == 64));
    }

    #[test]
    fn test_hashing_without_dims_is_rejected() {
        assert!(create_embedder(&config("hashing", None)).is_err());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        assert!(create_embedder(&config("carrier-pigeon", None)).is_err());
    }

    #[test]
    fn test_local_model_dims_defaults() {
        assert_eq!(
            resolve_local_model(&config("local", None)),
            ("all-minilm-l6-v2".to_string(), 384)
        );
        let mut base = config("local", None);
        base.model = Some("bge-base-en-v1.5".to_string());
        assert_eq!(resolve_local_model(&base).1, 768);
        base.dims = Some(512);
        assert_eq!(resolve_local_model(&base).1, 512);
    }

    #[cfg(feature = "local-embeddings-fastembed")]
    #[test]
    fn test_local_embedder_is_lazy() {
        let embedder = LocalEmbedder::new(&config("local", None)).unwrap();
        assert!(!embedder.is_loaded());
        assert_eq!(embedder.dims(), 384);
        assert!(embedder.embed(&[]).is_err());
        assert!(!embedder.is_loaded());
    }

    #[cfg(feature = "local-embeddings-fastembed")]
    #[test]
    fn test_unknown_local_model_is_rejected() {
        let mut c = config("local", None);
        c.model = Some("not-a-model".to_string());
        assert!(LocalEmbedder::new(&c).is_err());
    }
}
