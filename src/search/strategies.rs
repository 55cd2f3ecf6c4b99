//! Independent retrieval strategies.
//!
//! Every strategy is side-effect isolated: internal failures are logged and
//! translated to an empty contribution, so one failing source never aborts
//! the others. Only the orchestrator composes their outputs.

use crate::embed::VectorSearcher;
use crate::expand::QueryExpander;
use crate::model::SearchResult;
use crate::sparql::{builder, rows_to_results, TripleStore};

/// Minimum character-overlap similarity for a fuzzy hit to survive.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;

/// How many neighbours the vector strategy asks the index for.
const VECTOR_TOP_K: usize = 20;

/// Structural search with optional exact subject/predicate/object bindings.
pub fn pattern_search(
    store: &dyn TripleStore,
    subject: Option<&str>,
    predicate: Option<&str>,
    object: Option<&str>,
    language: Option<&str>,
) -> Vec<SearchResult> {
    let sparql = builder::pattern_query(subject, predicate, object, language);
    match store.select(&sparql) {
        Ok(rows) => rows_to_results(rows),
        Err(e) => {
            tracing::warn!(error = %e, "pattern strategy failed, contributing nothing");
            Vec::new()
        }
    }
}

/// Case-insensitive regex search over all three positions, post-filtered by
/// character-overlap similarity against the term.
pub fn fuzzy_search(
    store: &dyn TripleStore,
    term: &str,
    threshold: f64,
    language: Option<&str>,
) -> Vec<SearchResult> {
    let sparql = builder::fuzzy_query(term, language);
    let results = match store.select(&sparql) {
        Ok(rows) => rows_to_results(rows),
        Err(e) => {
            tracing::warn!(error = %e, "fuzzy strategy failed, contributing nothing");
            return Vec::new();
        }
    };

    results
        .into_iter()
        .filter(|r| char_overlap_similarity(term, &r.triple.combined_text()) >= threshold)
        .collect()
}

/// Expand the query (synonyms, stems, concepts, graph-related terms) and run
/// the union of terms as one disjunctive structural query.
pub fn expansion_search(
    store: &dyn TripleStore,
    expander: &QueryExpander,
    query: &str,
    language: Option<&str>,
) -> Vec<SearchResult> {
    let expanded = expander.expand(query, language.unwrap_or("en"));
    let sparql = expanded.to_sparql(language);
    match store.select(&sparql) {
        Ok(rows) => rows_to_results(rows),
        Err(e) => {
            tracing::warn!(error = %e, "expansion strategy failed, contributing nothing");
            Vec::new()
        }
    }
}

/// Cosine-similarity retrieval against the embedding index.
///
/// Contributes nothing when the backend was unavailable at startup.
pub fn vector_search(searcher: &VectorSearcher, query: &str) -> Vec<SearchResult> {
    match searcher.search(query, VECTOR_TOP_K, None) {
        Ok(results) => results,
        Err(e) => {
            tracing::warn!(error = %e, "vector strategy failed, contributing nothing");
            Vec::new()
        }
    }
}

/// Character-overlap similarity: the fraction of `text`'s characters that
/// also occur in `term`, over the longer of the two lengths.
pub fn char_overlap_similarity(term: &str, text: &str) -> f64 {
    let term_lower = term.to_lowercase();
    let text_lower = text.to_lowercase();

    let matches = text_lower
        .chars()
        .filter(|c| term_lower.contains(*c))
        .count();
    let max_length = term_lower.chars().count().max(text_lower.chars().count());
    if max_length == 0 {
        return 0.0;
    }
    matches as f64 / max_length as f64
}
