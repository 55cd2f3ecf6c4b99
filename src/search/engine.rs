//! The search orchestrator: the public entry point of the engine.
//!
//! One query fans out to translated variants, each variant runs the enabled
//! strategies concurrently, partial lists converge into one deduplicated set,
//! and ranking anchors on the original (untranslated) query. For a well-formed
//! query the orchestrator surfaces no internal failure: a broken pipeline
//! degrades to the fuzzy strategy alone, and only a truly empty universe
//! (`NoResults`) or invalid input (`MalformedQuery`) reaches the caller.

use std::path::Path;
use std::sync::Arc;

use crate::cache::{CacheStore, Resolved, ResolverStats, TieredResolver};
use crate::config::EngineConfig;
use crate::embed::{HttpEmbedder, VectorSearcher};
use crate::error::{EngineError, OntoResult};
use crate::expand::{QueryExpander, SynonymTable};
use crate::index::InvertedIndex;
use crate::model::{dedup_results, CachedResource, SearchResult};
use crate::rank::rank_results;
use crate::sparql::{builder, remote::RemoteEndpoint, rows_to_results, store::LocalStore, TripleStore};
use crate::translate::{TranslationStats, Translator};
use crate::corpus::Corpus;

use super::strategies;

/// Per-call feature flags for [`SearchEngine::search`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Restrict object literals to this language; `None` searches all.
    pub language: Option<String>,
    pub use_embeddings: bool,
    pub use_query_expansion: bool,
    pub use_translation: bool,
    /// Overrides the engine-level fuzzy threshold when set.
    pub fuzzy_threshold: Option<f64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            language: None,
            use_embeddings: true,
            use_query_expansion: true,
            use_translation: true,
            fuzzy_threshold: None,
        }
    }
}

/// Aggregate engine statistics for the `stats` operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineStats {
    #[serde(flatten)]
    pub resolver: ResolverStats,
    pub translation: TranslationStats,
    pub vector_search_available: bool,
    pub indexed_vectors: usize,
}

/// The resilient multi-source search engine.
pub struct SearchEngine {
    store: Arc<dyn TripleStore>,
    remote: RemoteEndpoint,
    resolver: TieredResolver,
    expander: QueryExpander,
    translator: Translator,
    vector: Option<VectorSearcher>,
    default_language: String,
    fuzzy_threshold: f64,
}

impl SearchEngine {
    /// Assemble an engine from explicit components.
    ///
    /// The triple store, cache, and offline index are the required core;
    /// translation starts offline-only and vector search disabled. Use the
    /// `with_*` builders to attach the optional services.
    pub fn new(
        store: Arc<dyn TripleStore>,
        cache: Arc<CacheStore>,
        index: Arc<InvertedIndex>,
    ) -> Self {
        Self {
            expander: QueryExpander::new(Arc::clone(&store), SynonymTable::default()),
            translator: Translator::new(Arc::clone(&cache), None),
            resolver: TieredResolver::new(cache, index),
            store,
            remote: RemoteEndpoint::dbpedia(),
            vector: None,
            default_language: "en".into(),
            fuzzy_threshold: strategies::DEFAULT_FUZZY_THRESHOLD,
        }
    }

    /// Assemble an engine from configuration, opening all persistent pieces.
    pub fn from_config(config: &EngineConfig) -> OntoResult<Self> {
        config.validate()?;

        let cache = Arc::new(CacheStore::open(&config.data_dir)?);
        let corpus = Arc::new(Corpus::load_dir(&config.corpus_dir)?);
        let index = Arc::new(InvertedIndex::build(corpus));

        let store: Arc<dyn TripleStore> = match &config.sparql_endpoint {
            Some(endpoint) => Arc::new(RemoteEndpoint::single(endpoint.clone())),
            None => Arc::new(LocalStore::open(&config.graph_dir())?),
        };

        let vector = config.embedding_service_url.as_ref().map(|url| {
            VectorSearcher::new(
                Box::new(HttpEmbedder::new(url.clone())),
                Arc::clone(&cache),
                config.vector_capacity,
            )
            .with_min_score(config.min_similarity)
        });

        let mut engine = Self::new(store, Arc::clone(&cache), index);
        engine.translator = Translator::new(cache, config.translation_service_url.clone());
        engine.vector = vector;
        engine.default_language = config.default_language.clone();
        engine.fuzzy_threshold = config.fuzzy_threshold;
        Ok(engine)
    }

    pub fn with_vector_searcher(mut self, vector: VectorSearcher) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_remote(mut self, remote: RemoteEndpoint) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    // -- public search surface ----------------------------------------------

    /// Multi-strategy semantic search.
    ///
    /// Rejects empty input before any I/O; otherwise never propagates an
    /// internal failure, degrading to the fuzzy strategy alone instead.
    pub fn search(&self, query: &str, options: &SearchOptions) -> OntoResult<Vec<SearchResult>> {
        let query = validated(query)?;

        match self.run_pipeline(query, options) {
            Ok(results) => Ok(results),
            Err(e) => {
                tracing::warn!(error = %e, "search pipeline failed, degrading to fuzzy strategy");
                let fallback = strategies::fuzzy_search(
                    self.store.as_ref(),
                    query,
                    options.fuzzy_threshold.unwrap_or(self.fuzzy_threshold),
                    options.language.as_deref(),
                );
                let merged = dedup_results(fallback);
                let total = merged.len().max(1);
                Ok(rank_results(merged, query, total))
            }
        }
    }

    fn run_pipeline(&self, query: &str, options: &SearchOptions) -> OntoResult<Vec<SearchResult>> {
        let lang_filter = options.language.as_deref();
        let threshold = options.fuzzy_threshold.unwrap_or(self.fuzzy_threshold);

        let variants = if options.use_translation {
            self.translator.translate_variants(query)
        } else {
            vec![query.to_string()]
        };

        let mut all = Vec::new();
        for variant in &variants {
            let (fuzzy, (expanded, vector)) = rayon::join(
                || strategies::fuzzy_search(self.store.as_ref(), variant, threshold, lang_filter),
                || {
                    rayon::join(
                        || {
                            if options.use_query_expansion {
                                strategies::expansion_search(
                                    self.store.as_ref(),
                                    &self.expander,
                                    variant,
                                    lang_filter,
                                )
                            } else {
                                Vec::new()
                            }
                        },
                        || {
                            if options.use_embeddings {
                                self.vector
                                    .as_ref()
                                    .filter(|v| v.is_available())
                                    .map(|v| strategies::vector_search(v, variant))
                                    .unwrap_or_default()
                            } else {
                                Vec::new()
                            }
                        },
                    )
                },
            );
            all.extend(fuzzy);
            all.extend(expanded);
            all.extend(vector);
        }

        let merged = dedup_results(all);
        let total = merged.len().max(1);
        // The original query is the relevance anchor, not any variant.
        Ok(rank_results(merged, query, total))
    }

    /// Structural search with optional exact bindings.
    pub fn search_by_pattern(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
        language: Option<&str>,
    ) -> OntoResult<Vec<SearchResult>> {
        let sparql = builder::pattern_query(subject, predicate, object, language);
        let rows = self.store.select(&sparql)?;
        Ok(rows_to_results(rows))
    }

    /// Triples with the given subject.
    pub fn search_by_subject(&self, subject: &str) -> OntoResult<Vec<SearchResult>> {
        self.search_by_pattern(Some(subject), None, None, None)
    }

    /// Triples with the given predicate.
    pub fn search_by_predicate(&self, predicate: &str) -> OntoResult<Vec<SearchResult>> {
        self.search_by_pattern(None, Some(predicate), None, None)
    }

    /// Triples with the given literal object.
    pub fn search_by_object(
        &self,
        object: &str,
        language: Option<&str>,
    ) -> OntoResult<Vec<SearchResult>> {
        self.search_by_pattern(None, None, Some(object), language)
    }

    /// Ranked fuzzy search at the given (or default) similarity threshold.
    pub fn fuzzy_search(
        &self,
        term: &str,
        threshold: Option<f64>,
        language: Option<&str>,
    ) -> OntoResult<Vec<SearchResult>> {
        let term = validated(term)?;
        let threshold = threshold.unwrap_or(self.fuzzy_threshold);

        let sparql = builder::fuzzy_query(term, language);
        let rows = self.store.select(&sparql)?;
        let results: Vec<SearchResult> = rows_to_results(rows)
            .into_iter()
            .filter(|r| {
                strategies::char_overlap_similarity(term, &r.triple.combined_text()) >= threshold
            })
            .collect();

        let total = results.len().max(1);
        Ok(rank_results(results, term, total))
    }

    // -- cache-tier operations ----------------------------------------------

    /// Resolve an external lookup through live → cache → offline tiers.
    pub fn resolve_with_fallback(
        &self,
        query: &str,
        language: Option<&str>,
    ) -> OntoResult<Resolved> {
        let query = validated(query)?;
        let language = language.unwrap_or(&self.default_language);
        let resolved = self.resolver.resolve_with_fallback(query, language, || {
            self.remote.search_resources(query, language)
        })?;
        Ok(resolved)
    }

    /// Re-verify a cache entry against a fresh live fetch.
    pub fn verify(&self, key: &str) -> OntoResult<bool> {
        let language = key
            .rsplit_once('_')
            .map(|(_, suffix)| suffix)
            .filter(|s| s.len() == 2)
            .unwrap_or(&self.default_language)
            .to_string();
        let verified = self
            .resolver
            .verify(key, |query| self.remote.search_resources(query, &language))?;
        Ok(verified)
    }

    /// Query the offline snapshot directly.
    pub fn search_offline(&self, query: &str, language: Option<&str>) -> Vec<CachedResource> {
        self.resolver
            .search_offline(query, language.unwrap_or(&self.default_language))
    }

    /// Cache, corpus, translation, and vector statistics.
    pub fn stats(&self) -> OntoResult<EngineStats> {
        Ok(EngineStats {
            resolver: self.resolver.stats()?,
            translation: self.translator.stats(),
            vector_search_available: self
                .vector
                .as_ref()
                .is_some_and(VectorSearcher::is_available),
            indexed_vectors: self.vector.as_ref().map_or(0, VectorSearcher::len),
        })
    }

    // -- knowledge base maintenance -----------------------------------------

    /// Insert one triple with a literal object into the store.
    pub fn insert_triple(&self, subject: &str, predicate: &str, object: &str) -> OntoResult<()> {
        self.store
            .update(&builder::insert_triple(subject, predicate, object))?;
        Ok(())
    }

    /// Embed every stored triple into the vector index.
    pub fn index_vectors(&self) -> OntoResult<usize> {
        let Some(vector) = self.vector.as_ref() else {
            return Ok(0);
        };
        let rows = self.store.select(&builder::all_triples_query())?;
        let triples: Vec<_> = rows_to_results(rows)
            .into_iter()
            .map(|r| r.triple)
            .collect();
        let indexed = vector.index_triples(&triples)?;
        tracing::info!(indexed, "vector index rebuilt");
        Ok(indexed)
    }

    /// The translator, for CLI translation commands.
    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Open just the persistent cache (used by maintenance commands).
    pub fn open_cache(data_dir: &Path) -> OntoResult<Arc<CacheStore>> {
        Ok(Arc::new(CacheStore::open(data_dir)?))
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("default_language", &self.default_language)
            .field("fuzzy_threshold", &self.fuzzy_threshold)
            .field("vector", &self.vector.is_some())
            .finish()
    }
}

/// Reject empty or whitespace-only input before any I/O.
fn validated(query: &str) -> OntoResult<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(EngineError::MalformedQuery {
            message: "query must contain at least one non-whitespace character".into(),
        }
        .into());
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OntoError;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> SearchEngine {
        let store = Arc::new(LocalStore::in_memory().unwrap());
        for (s, p, o) in [
            ("http://kb/BreakingBad", "http://kb/genre", "Crime drama"),
            ("http://kb/BreakingBad", "http://kb/label", "Breaking Bad"),
            ("http://kb/Dark", "http://kb/genre", "Science fiction"),
        ] {
            store.update(&builder::insert_triple(s, p, o)).unwrap();
        }
        let cache = Arc::new(CacheStore::open(dir.path()).unwrap());
        let index = Arc::new(InvertedIndex::build(Arc::new(Corpus::default())));
        SearchEngine::new(store, cache, index)
    }

    fn offline_options() -> SearchOptions {
        SearchOptions {
            use_translation: false,
            use_embeddings: false,
            ..SearchOptions::default()
        }
    }

    #[test]
    fn empty_query_is_malformed() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        let err = e.search("   ", &SearchOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            OntoError::Engine(EngineError::MalformedQuery { .. })
        ));
    }

    #[test]
    fn search_ranks_and_normalizes() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        let results = e.search("breaking", &offline_options()).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].score, Some(1.0));
        assert!(results[0].triple.subject.contains("BreakingBad"));
    }

    #[test]
    fn results_are_deduplicated_across_strategies() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        // Fuzzy and expansion both hit the same triples.
        let results = e.search("crime", &offline_options()).unwrap();
        let mut keys: Vec<_> = results.iter().map(SearchResult::dedup_key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), results.len());
    }

    #[test]
    fn expansion_widens_the_match_set() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        // "crimen" only matches through its synonym "crime".
        let with = e.search("crimen", &offline_options()).unwrap();
        assert!(with
            .iter()
            .any(|r| r.triple.subject == "http://kb/BreakingBad"));

        let without = e
            .search(
                "crimen",
                &SearchOptions {
                    use_query_expansion: false,
                    ..offline_options()
                },
            )
            .unwrap();
        assert!(without.len() < with.len() || without.is_empty());
    }

    #[test]
    fn pattern_search_binds_positions() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        let results = e
            .search_by_pattern(Some("http://kb/Dark"), None, None, None)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].triple.object, "Science fiction");
    }

    #[test]
    fn position_conveniences_delegate_to_pattern_search() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        assert_eq!(e.search_by_subject("http://kb/Dark").unwrap().len(), 1);
        assert_eq!(e.search_by_predicate("http://kb/genre").unwrap().len(), 2);
        let by_object = e.search_by_object("Crime drama", None).unwrap();
        assert_eq!(by_object.len(), 1);
        assert_eq!(by_object[0].triple.subject, "http://kb/BreakingBad");
    }

    #[test]
    fn fuzzy_search_rejects_empty_term() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        assert!(e.fuzzy_search("", None, None).is_err());
    }

    #[test]
    fn stats_reflect_disabled_vector_search() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        let stats = e.stats().unwrap();
        assert!(!stats.vector_search_available);
        assert_eq!(stats.indexed_vectors, 0);
        assert_eq!(stats.resolver.total_cached, 0);
    }
}
