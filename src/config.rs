//! TOML configuration parsing and validation.
//!
//! Loaded once at startup by [`load_config`]; invalid values are fatal.
//! A handful of settings can be overridden from the environment, which is
//! how container deployments usually configure the service:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `RVEC_DB_PATH` | `db.path` |
//! | `RVEC_CHUNK_SIZE` | `chunking.chunk_size` |
//! | `RVEC_CHUNK_OVERLAP` | `chunking.chunk_overlap` |
//! | `RVEC_BIND` | `server.bind` |

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use repo_vectorizer_core::chunk::{TextSplitter, DEFAULT_SEPARATORS};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            separators: default_separators(),
        }
    }
}

impl ChunkingConfig {
    pub fn splitter(&self) -> Result<TextSplitter> {
        Ok(TextSplitter::with_separators(
            self.chunk_size,
            self.chunk_overlap,
            self.separators.clone(),
        )?)
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    50
}
fn default_separators() -> Vec<String> {
    DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub default_k: usize,
    #[serde(default = "default_max_k")]
    pub max_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            max_k: default_max_k(),
        }
    }
}

fn default_k() -> usize {
    3
}
fn default_max_k() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Upper bound on embedding batches running at once on the blocking pool.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_concurrent() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8001".to_string()
}

/// Repository acquisition settings used by `analyze`.
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyzerConfig {
    #[serde(default = "default_repos_dir")]
    pub repos_dir: PathBuf,
    /// File extensions (without the dot) that are collected.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Files whose trimmed content is not longer than this are skipped.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Branch to check out. `None` follows the remote's default branch.
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default = "default_shallow")]
    pub shallow: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            repos_dir: default_repos_dir(),
            extensions: default_extensions(),
            min_content_chars: default_min_content_chars(),
            exclude_globs: Vec::new(),
            branch: None,
            shallow: default_shallow(),
        }
    }
}

fn default_repos_dir() -> PathBuf {
    PathBuf::from("./data/repos")
}
fn default_extensions() -> Vec<String> {
    ["java", "py", "js", "ts", "yaml", "yml", "json", "md"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_min_content_chars() -> usize {
    10
}
fn default_shallow() -> bool {
    true
}

impl Config {
    /// Apply `RVEC_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = lookup("RVEC_DB_PATH") {
            self.db.path = PathBuf::from(path);
        }
        if let Some(size) = lookup("RVEC_CHUNK_SIZE") {
            self.chunking.chunk_size = size
                .parse()
                .with_context(|| format!("RVEC_CHUNK_SIZE is not an integer: {}", size))?;
        }
        if let Some(overlap) = lookup("RVEC_CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = overlap
                .parse()
                .with_context(|| format!("RVEC_CHUNK_OVERLAP is not an integer: {}", overlap))?;
        }
        if let Some(bind) = lookup("RVEC_BIND") {
            self.server.bind = bind;
        }
        Ok(())
    }

    /// Check every invariant the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be > 0");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            bail!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap,
                self.chunking.chunk_size
            );
        }
        if self.chunking.separators.is_empty() {
            bail!("chunking.separators must not be empty");
        }

        if self.retrieval.default_k < 1 {
            bail!("retrieval.default_k must be >= 1");
        }
        if self.retrieval.max_k < self.retrieval.default_k {
            bail!("retrieval.max_k must be >= retrieval.default_k");
        }

        if self.embedding.batch_size < 1 {
            bail!("embedding.batch_size must be >= 1");
        }
        if self.embedding.max_concurrent < 1 {
            bail!("embedding.max_concurrent must be >= 1");
        }
        match self.embedding.provider.as_str() {
            "local" | "disabled" => {}
            "hashing" => {
                if self.embedding.dims.unwrap_or(0) == 0 {
                    bail!("embedding.dims must be > 0 when provider is 'hashing'");
                }
            }
            other => bail!(
                "Unknown embedding provider: '{}'. Must be local, hashing, or disabled.",
                other
            ),
        }
        if self.embedding.dims == Some(0) {
            bail!("embedding.dims must be > 0");
        }

        Ok(())
    }
}

/// Read, override from the environment, and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config.apply_env_overrides()?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(toml_str: &str) -> Config {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse("[db]\npath = \"/tmp/rvec.sqlite\"\n");
        config.validate().unwrap();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.chunking.separators, vec!["\n\n", "\n", " ", ""]);
        assert_eq!(config.retrieval.default_k, 3);
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.server.bind, "127.0.0.1:8001");
        assert!(config.analyzer.extensions.contains(&"py".to_string()));
        assert_eq!(config.analyzer.min_content_chars, 10);
    }

    #[test]
    fn test_overlap_must_be_below_chunk_size() {
        let config = parse(
            "[db]\npath = \"x.sqlite\"\n[chunking]\nchunk_size = 100\nchunk_overlap = 100\n",
        );
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("chunk_overlap"), "{}", err);
    }

    #[test]
    fn test_hashing_requires_dims() {
        let config = parse("[db]\npath = \"x.sqlite\"\n[embedding]\nprovider = \"hashing\"\n");
        assert!(config.validate().is_err());

        let config = parse(
            "[db]\npath = \"x.sqlite\"\n[embedding]\nprovider = \"hashing\"\ndims = 128\n",
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = parse("[db]\npath = \"x.sqlite\"\n[embedding]\nprovider = \"magic\"\n");
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("Unknown embedding provider"));
    }

    #[test]
    fn test_max_k_not_below_default_k() {
        let config =
            parse("[db]\npath = \"x.sqlite\"\n[retrieval]\ndefault_k = 10\nmax_k = 5\n");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = parse("[db]\npath = \"x.sqlite\"\n");
        let env: HashMap<&str, &str> = [
            ("RVEC_DB_PATH", "/data/chroma.sqlite"),
            ("RVEC_CHUNK_SIZE", "800"),
            ("RVEC_CHUNK_OVERLAP", "80"),
            ("RVEC_BIND", "0.0.0.0:9000"),
        ]
        .into_iter()
        .collect();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.db.path, PathBuf::from("/data/chroma.sqlite"));
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 80);
        assert_eq!(config.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn test_bad_env_override_is_an_error() {
        let mut config = parse("[db]\npath = \"x.sqlite\"\n");
        let result = config.apply_overrides(|k| {
            (k == "RVEC_CHUNK_SIZE").then(|| "lots".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rvec.toml");
        std::fs::write(
            &path,
            "[db]\npath = \"data/rvec.sqlite\"\n[chunking]\nchunk_size = 300\nchunk_overlap = 30\n",
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.chunking.chunk_size, 300);
        config.chunking.splitter().unwrap();
    }
}
