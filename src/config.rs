//! Engine configuration, persisted as TOML.
//!
//! Every field has a default, so an absent or partial config file still
//! yields a working engine: embedded triple store, local data directory,
//! no live embedding/translation services.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the cache database and the embedded triple store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory of per-language offline corpus snapshots (`en.json`, ...).
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,
    /// Remote SPARQL endpoint; `None` uses the embedded store.
    #[serde(default)]
    pub sparql_endpoint: Option<String>,
    /// Embedding service base URL; `None` disables vector search.
    #[serde(default)]
    pub embedding_service_url: Option<String>,
    /// Translation service base URL; `None` keeps translation offline-only.
    #[serde(default)]
    pub translation_service_url: Option<String>,
    /// Language assumed when the caller supplies none.
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Character-overlap threshold for the fuzzy strategy.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    /// Minimum cosine similarity for vector hits.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
    /// Capacity hint for the HNSW vector index.
    #[serde(default = "default_vector_capacity")]
    pub vector_capacity: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_corpus_dir() -> PathBuf {
    PathBuf::from("data/corpus")
}
fn default_language() -> String {
    "en".into()
}
fn default_fuzzy_threshold() -> f64 {
    0.7
}
fn default_min_similarity() -> f32 {
    0.5
}
fn default_vector_capacity() -> usize {
    10_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            corpus_dir: default_corpus_dir(),
            sparql_endpoint: None,
            embedding_service_url: None,
            translation_service_url: None,
            default_language: default_language(),
            fuzzy_threshold: default_fuzzy_threshold(),
            min_similarity: default_min_similarity(),
            vector_capacity: default_vector_capacity(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::InvalidConfig {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| EngineError::InvalidConfig {
            message: format!("cannot parse {}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, EngineError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(EngineError::InvalidConfig {
                message: format!(
                    "fuzzy_threshold must be within [0, 1], got {}",
                    self.fuzzy_threshold
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(EngineError::InvalidConfig {
                message: format!(
                    "min_similarity must be within [0, 1], got {}",
                    self.min_similarity
                ),
            });
        }
        if self.vector_capacity == 0 {
            return Err(EngineError::InvalidConfig {
                message: "vector_capacity must be positive".into(),
            });
        }
        Ok(())
    }

    /// Path of the embedded oxigraph store inside the data directory.
    pub fn graph_dir(&self) -> PathBuf {
        self.data_dir.join("graph")
    }
}
