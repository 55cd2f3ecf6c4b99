//! Query expansion: synonyms, stem variants, concept extraction, and
//! knowledge-graph related terms.
//!
//! The union of original + expanded terms compiles into a single disjunctive
//! structural query (see [`crate::sparql::builder::disjunctive_query`]) so the
//! number of upstream round trips stays constant no matter how wide the
//! expansion gets.

pub mod stem;

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::sparql::{builder, TripleStore};

/// A query together with everything expansion derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedQuery {
    pub original: String,
    pub expanded: Vec<String>,
    pub entities: Vec<String>,
    pub concepts: Vec<String>,
}

impl ExpandedQuery {
    /// Original plus expansions, originals first.
    pub fn all_terms(&self) -> Vec<String> {
        let mut terms = vec![self.original.clone()];
        terms.extend(self.expanded.iter().cloned());
        terms
    }

    /// The single disjunctive structural query covering every term.
    pub fn to_sparql(&self, language: Option<&str>) -> String {
        builder::disjunctive_query(&self.all_terms(), language)
    }
}

/// Immutable synonym table, injected at construction.
///
/// Extension happens through [`SynonymTable::add_synonyms`] on an owned
/// table, never through ambient shared state.
#[derive(Debug, Clone)]
pub struct SynonymTable {
    entries: HashMap<String, Vec<String>>,
}

impl Default for SynonymTable {
    fn default() -> Self {
        let mut table = Self {
            entries: HashMap::new(),
        };
        table.add_synonyms("doctor", &["médico", "physician", "profesional de la salud"]);
        table.add_synonyms("médico", &["doctor", "physician", "profesional de la salud"]);
        table.add_synonyms("serie", &["show", "programa", "serie de tv"]);
        table.add_synonyms("show", &["serie", "programa", "serie de tv"]);
        table.add_synonyms("familia", &["family", "parientes", "familiares"]);
        table.add_synonyms("family", &["familia", "parientes", "familiares"]);
        table.add_synonyms("tiempo", &["time", "temporal"]);
        table.add_synonyms("time", &["tiempo", "temporal"]);
        table.add_synonyms("viaje", &["travel", "journey", "trip"]);
        table.add_synonyms("travel", &["viaje", "journey", "trip"]);
        table.add_synonyms("crimen", &["crime", "delito", "criminal"]);
        table.add_synonyms("crime", &["crimen", "delito", "criminal"]);
        table
    }
}

impl SynonymTable {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register synonyms for a word, appending to any existing list.
    pub fn add_synonyms(&mut self, word: &str, synonyms: &[&str]) {
        let list = self.entries.entry(word.to_lowercase()).or_default();
        for syn in synonyms {
            let syn = syn.to_string();
            if !list.contains(&syn) {
                list.push(syn);
            }
        }
    }

    pub fn synonyms_of(&self, word: &str) -> &[String] {
        self.entries
            .get(&word.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Expands free-text queries before structural search.
pub struct QueryExpander {
    store: Arc<dyn TripleStore>,
    synonyms: SynonymTable,
    concept_patterns: Vec<Regex>,
}

impl QueryExpander {
    pub fn new(store: Arc<dyn TripleStore>, synonyms: SynonymTable) -> Self {
        Self {
            store,
            synonyms,
            concept_patterns: concept_patterns(),
        }
    }

    /// Expand a query into synonyms, stems, concepts, entities, and
    /// graph-related terms.
    ///
    /// Never fails: an unreachable store just contributes no related terms.
    pub fn expand(&self, query: &str, language: &str) -> ExpandedQuery {
        let normalized = query.trim().to_lowercase();
        let tokens: Vec<&str> = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let mut expanded: Vec<String> = Vec::new();
        let mut push = |term: String, expanded: &mut Vec<String>| {
            if term != normalized && !term.trim().is_empty() && !expanded.contains(&term) {
                expanded.push(term);
            }
        };

        for token in &tokens {
            for syn in self.synonyms.synonyms_of(token) {
                push(syn.clone(), &mut expanded);
            }
        }

        for related in self.related_terms(&normalized) {
            push(related, &mut expanded);
        }

        for stemmed in stem::stemmed_variations(&tokens, language) {
            push(stemmed, &mut expanded);
        }

        let result = ExpandedQuery {
            original: query.to_string(),
            entities: extract_entities(query),
            concepts: self.extract_concepts(&normalized),
            expanded,
        };
        tracing::debug!(
            query = %query,
            additional = result.expanded.len(),
            "query expanded"
        );
        result
    }

    /// Labels reachable over `skos:related`/`owl:sameAs`/`rdfs:seeAlso` edges.
    fn related_terms(&self, term: &str) -> Vec<String> {
        let sparql = builder::related_terms_query(term);
        match self.store.select(&sparql) {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|row| {
                    let label = row.get("relatedLabel")?.value.trim().to_string();
                    (!label.is_empty()).then_some(label)
                })
                .collect(),
            Err(e) => {
                tracing::debug!(error = %e, "related-term lookup failed");
                Vec::new()
            }
        }
    }

    fn extract_concepts(&self, text: &str) -> Vec<String> {
        self.concept_patterns
            .iter()
            .filter_map(|pattern| pattern.find(text).map(|m| m.as_str().to_string()))
            .collect()
    }
}

impl std::fmt::Debug for QueryExpander {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExpander")
            .field("synonyms", &self.synonyms.len())
            .finish()
    }
}

/// Domain concept patterns recognized in query text.
fn concept_patterns() -> Vec<Regex> {
    [
        r"(?i)viaj(e|es|ar) (en|a través|por) (el )?tiempo",
        r"(?i)máquina (del|de) tiempo",
        r"(?i)paradoja temporal",
        r"(?i)serie (de|sobre) (crímenes|detectives|policía)",
        r"(?i)drama familiar",
        r"(?i)ciencia ficción",
        r"(?i)comedia romántica",
        r"(?i)time travel",
        r"(?i)science fiction",
        r"(?i)family drama",
        r"(?i)crime (series|show|drama)",
        r"(?i)romantic comedy",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
}

/// Capitalized-token runs treated as named entities.
///
/// A leading capitalized word only counts when followed by another, so
/// sentence-initial capitalization alone does not produce an entity.
fn extract_entities(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut entities = Vec::new();
    let mut run: Vec<&str> = Vec::new();

    for (i, word) in words.iter().enumerate() {
        let capitalized = word
            .chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false);
        if capitalized {
            run.push(word);
        } else {
            let at_start = i == run.len();
            flush_run(&mut run, at_start, &mut entities);
        }
    }
    let at_start = words.len() == run.len();
    flush_run(&mut run, at_start, &mut entities);

    entities.dedup();
    entities
}

fn flush_run(run: &mut Vec<&str>, at_sentence_start: bool, entities: &mut Vec<String>) {
    if run.len() >= 2 || (run.len() == 1 && !at_sentence_start) {
        entities.push(run.join(" "));
    }
    run.clear();
}
