//! Embedded SPARQL store backed by oxigraph.
//!
//! Holds the uploaded knowledge base (triples converted from OWL/RDF
//! ontologies). Supports in-memory operation for tests and on-disk
//! persistence for deployments.

use oxigraph::model::Term;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::error::TripleStoreError;

use super::{Binding, BindingRow, StoreResult, TripleStore};

/// Embedded oxigraph store implementing [`TripleStore`].
pub struct LocalStore {
    store: Store,
}

impl LocalStore {
    /// Create a new in-memory store (no persistence).
    pub fn in_memory() -> StoreResult<Self> {
        let store = Store::new().map_err(|e| TripleStoreError::Sparql {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self { store })
    }

    /// Open or create a persistent store at the given path.
    pub fn open(path: &std::path::Path) -> StoreResult<Self> {
        std::fs::create_dir_all(path).map_err(|e| TripleStoreError::Sparql {
            message: format!("failed to create oxigraph directory: {e}"),
        })?;
        let store = Store::open(path).map_err(|e| TripleStoreError::Sparql {
            message: format!("failed to open oxigraph store at {}: {e}", path.display()),
        })?;
        Ok(Self { store })
    }

    /// Number of triples in the store.
    pub fn len(&self) -> StoreResult<usize> {
        self.store.len().map_err(|e| TripleStoreError::Sparql {
            message: format!("len failed: {e}"),
        })
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        self.len().map(|n| n == 0)
    }

    /// Internal store reference, for advanced oxigraph operations.
    pub fn store(&self) -> &Store {
        &self.store
    }
}

/// Render a term as its bare value plus an optional language tag.
fn term_to_binding(term: &Term) -> Binding {
    match term {
        Term::NamedNode(node) => Binding::plain(node.as_str()),
        Term::Literal(literal) => Binding {
            value: literal.value().to_string(),
            language: literal.language().map(str::to_string),
        },
        Term::BlankNode(node) => Binding::plain(node.as_str()),
        other => Binding::plain(other.to_string()),
    }
}

impl TripleStore for LocalStore {
    fn select(&self, sparql: &str) -> StoreResult<Vec<BindingRow>> {
        let results = self.store.query(sparql).map_err(|e| TripleStoreError::Sparql {
            message: format!("SPARQL query failed: {e}"),
        })?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| TripleStoreError::Sparql {
                        message: format!("solution error: {e}"),
                    })?;
                    let mut row = BindingRow::new();
                    for (var, term) in solution.iter() {
                        row.insert(var.as_str().to_string(), term_to_binding(term));
                    }
                    rows.push(row);
                }
                Ok(rows)
            }
            QueryResults::Boolean(b) => {
                let mut row = BindingRow::new();
                row.insert("result".into(), Binding::plain(b.to_string()));
                Ok(vec![row])
            }
            QueryResults::Graph(_) => Err(TripleStoreError::Sparql {
                message: "CONSTRUCT/DESCRIBE queries not supported via select".into(),
            }),
        }
    }

    fn update(&self, sparql: &str) -> StoreResult<()> {
        self.store.update(sparql).map_err(|e| TripleStoreError::Sparql {
            message: format!("SPARQL update failed: {e}"),
        })
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::builder;

    fn seeded_store() -> LocalStore {
        let store = LocalStore::in_memory().unwrap();
        store
            .update(&builder::insert_triple(
                "http://kb/BreakingBad",
                "http://kb/genre",
                "Crime drama",
            ))
            .unwrap();
        store
            .update(&builder::insert_triple(
                "http://kb/Dark",
                "http://kb/genre",
                "Science fiction",
            ))
            .unwrap();
        store
    }

    #[test]
    fn insert_and_select_all() {
        let store = seeded_store();
        let rows = store
            .select("SELECT ?subject ?predicate ?object WHERE { ?subject ?predicate ?object }")
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn fuzzy_query_matches_object_literal() {
        let store = seeded_store();
        let rows = store.select(&builder::fuzzy_query("crime", None)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["object"].value, "Crime drama");
    }

    #[test]
    fn pattern_query_with_bound_subject() {
        let store = seeded_store();
        let q = builder::pattern_query(Some("http://kb/Dark"), None, None, None);
        let rows = store.select(&q).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["object"].value, "Science fiction");
    }

    #[test]
    fn literal_values_come_back_bare() {
        let store = seeded_store();
        let rows = store.select(&builder::fuzzy_query("crime", None)).unwrap();
        // No surrounding quotes, no datatype suffix.
        assert!(!rows[0]["object"].value.contains('"'));
    }
}
