//! Core data model: triples, search results, cache entries, corpus entries.
//!
//! Triples are immutable once produced by a retrieval strategy; scoring copies
//! them into enriched `SearchResult` views rather than mutating them.

use serde::{Deserialize, Serialize};

/// A subject–predicate–object statement.
///
/// Subject and predicate are URIs; the object may be a URI or a literal.
/// The optional language tag comes from the object literal when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Concatenated lower-cased text of all three fields, used by the scorer.
    pub fn combined_text(&self) -> String {
        format!("{} {} {}", self.subject, self.predicate, self.object).to_lowercase()
    }

    /// Total character length of the three fields.
    pub fn text_len(&self) -> usize {
        self.subject.len() + self.predicate.len() + self.object.len()
    }
}

/// A triple produced by a retrieval strategy, plus scoring and provenance.
///
/// Created fresh per query; scored (and possibly dropped) by the ranking pass;
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub triple: Triple,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

impl SearchResult {
    pub fn from_triple(triple: Triple) -> Self {
        Self {
            triple,
            score: None,
            document_id: None,
        }
    }

    /// Structural key used for deduplication across strategies.
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.triple.subject.clone(),
            self.triple.predicate.clone(),
            self.triple.object.clone(),
        )
    }
}

/// Remove exact (subject, predicate, object) duplicates, first occurrence wins.
pub fn dedup_results(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = std::collections::HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key()))
        .collect()
}

/// A resource record as returned by an external knowledge source lookup.
///
/// This is the payload shape cached per query by the tiered resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResource {
    pub uri: String,
    pub label: String,
    #[serde(default)]
    pub r#abstract: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Coarse category assigned to a cache entry for stats grouping.
pub fn detect_category(query: &str, results: &[CachedResource]) -> &'static str {
    let lower = query.to_lowercase();
    const TV_KEYWORDS: &[&str] = &["series", "show", "tv", "television", "episode", "season"];
    if TV_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return "tv_series";
    }

    if let Some(first) = results.first() {
        let kind = first.kind.to_lowercase();
        if kind.contains("televisionshow") || kind.contains("series") {
            return "tv_series";
        }
        if kind.contains("person") {
            return "person";
        }
        if kind.contains("organization") {
            return "organization";
        }
    }

    "other"
}

/// A persisted record of one external query's results.
///
/// Created on first successful live fetch, updated on every later
/// verification, never deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// `"<query>_<language>"` key.
    pub key: String,
    pub payload: Vec<CachedResource>,
    pub category: String,
    pub verified: bool,
    pub confidence: f64,
    /// Seconds since the Unix epoch of the last successful verification.
    pub last_verified: u64,
}

impl CacheEntry {
    pub fn fresh(key: impl Into<String>, payload: Vec<CachedResource>) -> Self {
        let key = key.into();
        let query = key.rsplit_once('_').map(|(q, _)| q).unwrap_or(&key);
        let category = detect_category(query, &payload).to_string();
        Self {
            key,
            payload,
            category,
            verified: true,
            confidence: 1.0,
            last_verified: now_epoch_secs(),
        }
    }
}

/// Current wall-clock time as seconds since the Unix epoch.
pub fn now_epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// One harvested entry in a per-language offline corpus snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub uri: String,
    pub label: String,
    #[serde(default)]
    pub r#abstract: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub network: String,
    #[serde(default, rename = "startDate")]
    pub start_date: String,
    #[serde(default)]
    pub resource: String,
}

/// A corpus entry prepared for search: lowered text plus its keyword tokens.
///
/// Derived at startup from the corpus snapshot; the snapshot is the source of
/// truth and this structure is rebuilt wholesale on every process start.
#[derive(Debug, Clone)]
pub struct IndexedEntry {
    pub entry: CorpusEntry,
    pub label_lower: String,
    pub abstract_lower: String,
    pub keywords: Vec<String>,
}
