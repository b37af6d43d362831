//! Embedding trait, the offline hashing embedder, and vector utilities.
//!
//! [`Embedder::embed`] is a blocking call by contract: model-backed
//! implementations run inference on the calling thread. Async callers must
//! move it off their dispatch threads (the application crate uses
//! `tokio::task::spawn_blocking`).
//!
//! The model-backed implementation (fastembed) lives in the `repo-vectorizer`
//! app crate.

use sha2::{Digest, Sha256};

use crate::error::{Result, RetrievalError};

/// A text → vector capability with a fixed output dimensionality.
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    ///
    /// # Errors
    ///
    /// [`RetrievalError::Embedding`] if `texts` is empty or the backend
    /// fails. No partial results are returned.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text (used for queries).
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::embedding("Empty embedding response"))
    }
}

/// Verify that a backend returned one `dims`-sized vector per input.
pub fn check_embeddings(expected: usize, dims: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected {
        return Err(RetrievalError::embedding(format!(
            "expected {} embeddings, got {}",
            expected,
            vectors.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(RetrievalError::embedding(format!(
            "expected {}-dimensional embeddings, got {}",
            dims,
            bad.len()
        )));
    }
    Ok(())
}

/// Deterministic, dependency-free embedder based on feature hashing.
///
/// Each lowercase word and each character trigram of a word is hashed
/// (SHA-256) into one of `dims` buckets with a hash-derived sign; the result
/// is L2-normalised. Texts sharing vocabulary land close together under
/// cosine distance. Intended for tests and air-gapped installs, not for
/// semantic quality.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            return Err(RetrievalError::Config(
                "hashing embedder dims must be > 0".to_string(),
            ));
        }
        Ok(Self { dims })
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            self.accumulate(&mut vector, "w", word, 1.0);

            let chars: Vec<char> = word.chars().collect();
            if chars.len() > 3 {
                for tri in chars.windows(3) {
                    let tri: String = tri.iter().collect();
                    self.accumulate(&mut vector, "c", &tri, 0.5);
                }
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], kind: &str, feature: &str, weight: f32) {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update([0u8]);
        hasher.update(feature.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let h = u64::from_le_bytes(bytes);

        let bucket = (h % self.dims as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(RetrievalError::embedding("no texts to embed"));
        }
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use repo_vectorizer_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB produced by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors, zero vectors, or vectors of different
/// lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// The distance every index store ranks by: `1 - cosine_similarity`,
/// in `[0.0, 2.0]`, lower is nearer.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        assert!(cosine_distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_hashing_embedder_shape_and_determinism() {
        let embedder = HashingEmbedder::new(64).unwrap();
        let texts = vec!["fn main() {}".to_string(), "let x = 1;".to_string()];
        let a = embedder.embed(&texts).unwrap();
        let b = embedder.embed(&texts).unwrap();
        check_embeddings(2, 64, &a).unwrap();
        assert_eq!(a, b);
        let norm: f32 = a[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashing_embedder_related_text_is_nearer() {
        let embedder = HashingEmbedder::new(256).unwrap();
        let query = embedder.embed_one("parse the config file").unwrap();
        let related = embedder.embed_one("fn parse_config(file: &Path)").unwrap();
        let unrelated = embedder.embed_one("render a triangle with opengl").unwrap();
        assert!(cosine_distance(&query, &related) < cosine_distance(&query, &unrelated));
    }

    #[test]
    fn test_hashing_embedder_rejects_empty_batch() {
        let embedder = HashingEmbedder::new(8).unwrap();
        assert!(matches!(
            embedder.embed(&[]),
            Err(RetrievalError::Embedding(_))
        ));
        assert!(HashingEmbedder::new(0).is_err());
    }

    #[test]
    fn test_check_embeddings_mismatch() {
        let vectors = vec![vec![0.0; 4], vec![0.0; 3]];
        assert!(check_embeddings(3, 4, &vectors).is_err());
        assert!(check_embeddings(2, 4, &vectors).is_err());
        assert!(check_embeddings(2, 4, &[vec![0.0; 4], vec![1.0; 4]]).is_ok());
    }
}
