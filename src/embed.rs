//! Vector-similarity retrieval over an HNSW index.
//!
//! Embeddings come from an external HTTP backend whose availability is probed
//! exactly once at startup, not per query. When the backend is down, vector
//! search is disabled for the process lifetime and the other strategies carry
//! the query. Query embeddings are cached in redb keyed by `(model, text)`.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use anndists::dist::DistCosine;
use hnsw_rs::hnsw::Hnsw;

use crate::cache::CacheStore;
use crate::error::EmbedError;
use crate::model::{SearchResult, Triple};

/// Result type for embedding operations.
pub type EmbedResult<T> = std::result::Result<T, EmbedError>;

/// Sentence-transformer model the default backend serves.
pub const EMBEDDING_MODEL: &str = "paraphrase-multilingual-MiniLM-L12-v2";

/// Output dimension of [`EMBEDDING_MODEL`].
pub const EMBEDDING_DIM: usize = 384;

/// Minimum cosine similarity for a vector hit to count.
pub const DEFAULT_MIN_SCORE: f32 = 0.5;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const EMBED_TIMEOUT: Duration = Duration::from_secs(10);

/// Produces text embeddings. The trait seam exists so tests can swap in a
/// deterministic local embedder.
pub trait Embedder: Send + Sync {
    /// Lightweight handshake; called once at startup.
    fn health_check(&self) -> bool;

    /// Embed a single non-empty text.
    fn embed(&self, text: &str) -> EmbedResult<Vec<f32>>;

    fn model(&self) -> &str;

    fn dimension(&self) -> usize;
}

/// HTTP embedding backend (`GET /health`, `POST /embed`).
pub struct HttpEmbedder {
    base_url: String,
}

impl HttpEmbedder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Embedder for HttpEmbedder {
    fn health_check(&self) -> bool {
        ureq::get(&format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .call()
            .is_ok()
    }

    fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        let response = ureq::post(&format!("{}/embed", self.base_url))
            .timeout(EMBED_TIMEOUT)
            .send_json(serde_json::json!({
                "texts": [text],
                "normalize": true,
            }))
            .map_err(|e| EmbedError::Request {
                message: format!("embed call failed: {e}"),
            })?;

        let body: serde_json::Value = response.into_json().map_err(|e| EmbedError::Request {
            message: format!("malformed embed response: {e}"),
        })?;

        let vector = body
            .get("embeddings")
            .and_then(|e| e.get(0))
            .and_then(|v| v.as_array())
            .ok_or_else(|| EmbedError::Request {
                message: "missing embeddings[0] in response".into(),
            })?
            .iter()
            .map(|n| n.as_f64().unwrap_or(0.0) as f32)
            .collect();

        Ok(vector)
    }

    fn model(&self) -> &str {
        EMBEDDING_MODEL
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Vector-similarity searcher: embedding backend + HNSW index + redb cache.
pub struct VectorSearcher {
    embedder: Box<dyn Embedder>,
    cache: Arc<CacheStore>,
    hnsw: RwLock<Hnsw<'static, f32, DistCosine>>,
    docs: RwLock<Vec<Triple>>,
    available: bool,
    min_score: f32,
}

// Safety: Hnsw uses internal synchronization via atomics/locks.
// The RwLock wrapper provides the outer synchronization needed.
unsafe impl Send for VectorSearcher {}
unsafe impl Sync for VectorSearcher {}

impl VectorSearcher {
    /// Create a searcher, probing the embedding backend once.
    ///
    /// `max_elements` is a capacity hint for the HNSW index.
    pub fn new(embedder: Box<dyn Embedder>, cache: Arc<CacheStore>, max_elements: usize) -> Self {
        let available = embedder.health_check();
        if available {
            tracing::info!(model = embedder.model(), dim = embedder.dimension(), "embedding backend available");
        } else {
            tracing::warn!("embedding backend unavailable, vector search disabled for this process");
        }

        let max_layer = (max_elements as f64).log2().ceil() as usize;
        let max_layer = max_layer.clamp(4, 16);
        let hnsw = Hnsw::new(max_layer, max_elements.max(16), 16, 200, DistCosine {});

        Self {
            embedder,
            cache,
            hnsw: RwLock::new(hnsw),
            docs: RwLock::new(Vec::new()),
            available,
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Whether the startup handshake succeeded.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Embedding for a text, cache first, then the live backend.
    pub fn embedding_for(&self, text: &str) -> EmbedResult<Vec<f32>> {
        if !self.available {
            return Err(EmbedError::BackendUnavailable);
        }
        let normalized = text.trim();
        if normalized.is_empty() {
            return Err(EmbedError::Request {
                message: "cannot embed empty text".into(),
            });
        }

        let model = self.embedder.model();
        match self.cache.get_embedding(model, normalized) {
            Ok(Some(vector)) => return Ok(vector),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "embedding cache read failed"),
        }

        let vector = self.embedder.embed(normalized)?;
        let expected = self.embedder.dimension();
        if vector.len() != expected {
            return Err(EmbedError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        // Best-effort cache write.
        if let Err(e) = self.cache.put_embedding(model, normalized, &vector) {
            tracing::warn!(error = %e, "embedding cache write failed");
        }
        Ok(vector)
    }

    /// Embed and index a batch of triples for later similarity search.
    pub fn index_triples(&self, triples: &[Triple]) -> EmbedResult<usize> {
        if !self.available {
            return Err(EmbedError::BackendUnavailable);
        }

        let mut indexed = 0;
        for triple in triples {
            let vector = match self.embedding_for(&triple.combined_text()) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(subject = %triple.subject, error = %e, "skipping unembeddable triple");
                    continue;
                }
            };

            let mut docs = self.docs.write().map_err(|_| EmbedError::Hnsw {
                message: "document lock poisoned".into(),
            })?;
            let id = docs.len();
            docs.push(triple.clone());
            drop(docs);

            let hnsw = self.hnsw.read().map_err(|_| EmbedError::Hnsw {
                message: "HNSW lock poisoned".into(),
            })?;
            hnsw.insert((&vector, id));
            indexed += 1;
        }
        Ok(indexed)
    }

    /// Top-`k` triples whose embedding is cosine-similar to the query.
    ///
    /// Hits below `min_score` (or the configured default) are dropped.
    pub fn search(
        &self,
        query: &str,
        k: usize,
        min_score: Option<f32>,
    ) -> EmbedResult<Vec<SearchResult>> {
        let min_score = min_score.unwrap_or(self.min_score);
        let vector = self.embedding_for(query)?;

        let hnsw = self.hnsw.read().map_err(|_| EmbedError::Hnsw {
            message: "HNSW lock poisoned".into(),
        })?;
        let ef_search = (k * 2).max(32);
        let neighbours = hnsw.search(&vector, k, ef_search);
        drop(hnsw);

        let docs = self.docs.read().map_err(|_| EmbedError::Hnsw {
            message: "document lock poisoned".into(),
        })?;

        let mut results: Vec<SearchResult> = neighbours
            .into_iter()
            .filter_map(|n| {
                // DistCosine reports distance = 1 - cosine similarity.
                let similarity = 1.0 - n.distance;
                if similarity < min_score {
                    return None;
                }
                let triple = docs.get(n.d_id)?.clone();
                Some(SearchResult {
                    triple,
                    score: Some(similarity as f64),
                    document_id: Some(format!("vec-{}", n.d_id)),
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(results)
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for VectorSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorSearcher")
            .field("model", &self.embedder.model())
            .field("available", &self.available)
            .field("indexed", &self.len())
            .finish()
    }
}
