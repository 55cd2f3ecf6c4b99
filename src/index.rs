//! In-memory inverted index for sub-linear offline lookup.
//!
//! Built once at startup from the offline corpus and never mutated afterward,
//! so concurrent reads need no synchronization. The token map is a *candidate
//! filter*, not the final match: candidates are still containment-checked
//! against the full query, and an empty candidate set falls back to a linear
//! scan so the index can never cause false negatives.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::corpus::{tokenize, Corpus};
use crate::model::IndexedEntry;

/// Maximum results returned by an offline lookup.
const MAX_OFFLINE_RESULTS: usize = 20;

/// Language-partitioned keyword → entry-index map over the offline corpus.
pub struct InvertedIndex {
    corpus: Arc<Corpus>,
    /// language → (keyword → entry indices).
    map: HashMap<String, HashMap<String, HashSet<usize>>>,
}

impl InvertedIndex {
    /// Build the index over every loaded language.
    pub fn build(corpus: Arc<Corpus>) -> Self {
        let mut map: HashMap<String, HashMap<String, HashSet<usize>>> = HashMap::new();

        for lang in corpus.languages() {
            let mut lang_map: HashMap<String, HashSet<usize>> = HashMap::new();
            for (idx, entry) in corpus.entries(lang).iter().enumerate() {
                for keyword in &entry.keywords {
                    lang_map.entry(keyword.clone()).or_default().insert(idx);
                }
            }
            tracing::debug!(
                language = lang,
                keywords = lang_map.len(),
                "built inverted index partition"
            );
            map.insert(lang.to_string(), lang_map);
        }

        Self { corpus, map }
    }

    /// Search the offline corpus for entries containing the query.
    ///
    /// Label matches rank before abstract-only matches; at most
    /// [`MAX_OFFLINE_RESULTS`] entries are returned. Queries whose tokens all
    /// fall below the index's minimum length take the linear-scan path, which
    /// is accepted: the corpus is small enough that a full scan is cheap.
    pub fn search<'a>(&'a self, query: &str, language: &str) -> Vec<&'a IndexedEntry> {
        let query_lower = query.trim().to_lowercase();
        if query_lower.is_empty() {
            return Vec::new();
        }

        let entries = self.corpus.entries(language);
        if entries.is_empty() {
            return Vec::new();
        }

        let candidates = self.candidate_set(&query_lower, language);

        let mut label_hits = Vec::new();
        let mut abstract_hits = Vec::new();
        let mut push = |entry: &'a IndexedEntry| {
            if entry.label_lower.contains(&query_lower) {
                label_hits.push(entry);
            } else if entry.abstract_lower.contains(&query_lower) {
                abstract_hits.push(entry);
            }
        };

        match candidates {
            Some(set) => {
                let mut indices: Vec<usize> = set.into_iter().collect();
                indices.sort_unstable();
                for idx in indices {
                    if let Some(entry) = entries.get(idx) {
                        push(entry);
                    }
                }
            }
            // No token matched (short or stop-word-only query): linear scan.
            None => {
                for entry in entries {
                    push(entry);
                }
            }
        }

        label_hits.extend(abstract_hits);
        label_hits.truncate(MAX_OFFLINE_RESULTS);
        label_hits
    }

    /// Union of entry-index sets for all query tokens present in the map.
    /// `None` means no token matched and the caller must scan linearly.
    fn candidate_set(&self, query_lower: &str, language: &str) -> Option<HashSet<usize>> {
        let lang_map = self.map.get(language)?;
        let mut union: Option<HashSet<usize>> = None;
        for token in tokenize(query_lower) {
            if let Some(indices) = lang_map.get(&token) {
                union.get_or_insert_with(HashSet::new).extend(indices.iter().copied());
            }
        }
        union.filter(|set| !set.is_empty())
    }

    /// Number of entries visible to this index.
    pub fn corpus_size(&self) -> usize {
        self.corpus.len()
    }
}

impl std::fmt::Debug for InvertedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvertedIndex")
            .field("languages", &self.map.len())
            .field("corpus_size", &self.corpus.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CorpusEntry;

    fn entry(uri: &str, label: &str, abs: &str) -> CorpusEntry {
        CorpusEntry {
            uri: uri.into(),
            label: label.into(),
            r#abstract: abs.into(),
            genre: "Drama".into(),
            ..Default::default()
        }
    }

    fn test_index() -> InvertedIndex {
        let corpus = Corpus::from_entries(
            "en",
            vec![
                entry("u1", "Breaking Bad", "a chemistry teacher"),
                entry("u2", "Better Call Saul", "a lawyer in Albuquerque"),
                entry("u3", "Dark", "time travel in a german town"),
            ],
        );
        InvertedIndex::build(Arc::new(corpus))
    }

    #[test]
    fn finds_entry_by_label_token() {
        let index = test_index();
        let hits = index.search("bad", "en");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.uri, "u1");
    }

    #[test]
    fn label_matches_rank_before_abstract_matches() {
        // Both entries are candidates via the "chemistry" keyword, but only
        // the second contains the full phrase in its label.
        let corpus = Corpus::from_entries(
            "en",
            vec![
                entry("u1", "Advanced Chemistry", "about a chemistry teacher"),
                entry("u2", "Chemistry Teacher Drama", "unrelated"),
            ],
        );
        let index = InvertedIndex::build(Arc::new(corpus));
        let hits = index.search("chemistry teacher", "en");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entry.uri, "u2"); // label match first
        assert_eq!(hits[1].entry.uri, "u1");
    }

    #[test]
    fn short_query_takes_linear_path() {
        let index = test_index();
        // "ba" is below MIN_TOKEN_LEN, so no token can match; the linear
        // scan must still find the label containment.
        let hits = index.search("ba", "en");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.uri, "u1");
    }

    #[test]
    fn unknown_language_is_empty() {
        let index = test_index();
        assert!(index.search("bad", "pt").is_empty());
    }

    #[test]
    fn abstract_containment_matches() {
        let index = test_index();
        let hits = index.search("time travel", "en");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.uri, "u3");
    }

    #[test]
    fn index_search_is_subset_of_linear_scan() {
        let index = test_index();
        for query in ["bad", "saul", "time", "chemistry", "xyz", "a"] {
            let indexed: Vec<&str> = index
                .search(query, "en")
                .iter()
                .map(|e| e.entry.uri.as_str())
                .collect();

            let lower = query.to_lowercase();
            let linear: Vec<&str> = index
                .corpus
                .entries("en")
                .iter()
                .filter(|e| e.label_lower.contains(&lower) || e.abstract_lower.contains(&lower))
                .map(|e| e.entry.uri.as_str())
                .collect();

            for uri in &indexed {
                assert!(linear.contains(uri), "query {query:?}: {uri} not in linear scan");
            }
        }
    }

    #[test]
    fn candidate_hit_equals_linear_scan_for_indexed_tokens() {
        let index = test_index();
        // "bad" is an indexed token, so the candidate-filtered result must
        // equal the full linear-scan result.
        let indexed: Vec<&str> = index
            .search("bad", "en")
            .iter()
            .map(|e| e.entry.uri.as_str())
            .collect();
        let linear: Vec<&str> = index
            .corpus
            .entries("en")
            .iter()
            .filter(|e| e.label_lower.contains("bad") || e.abstract_lower.contains("bad"))
            .map(|e| e.entry.uri.as_str())
            .collect();
        assert_eq!(indexed, linear);
    }
}
