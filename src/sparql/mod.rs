//! SPARQL access layer: query builders plus local (oxigraph) and remote
//! (HTTP endpoint) triple stores behind one trait.

pub mod builder;
pub mod remote;
pub mod store;

pub use remote::RemoteEndpoint;
pub use store::LocalStore;

use std::collections::HashMap;

use crate::error::TripleStoreError;
use crate::model::{SearchResult, Triple};

/// Result type for triple-store operations.
pub type StoreResult<T> = std::result::Result<T, TripleStoreError>;

/// One bound term in a SPARQL solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub value: String,
    /// Language tag for tagged literals.
    pub language: Option<String>,
}

impl Binding {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
        }
    }
}

/// One row of variable bindings from a SELECT query.
pub type BindingRow = HashMap<String, Binding>;

/// A store that answers SPARQL SELECT queries and accepts updates.
///
/// Implemented by the embedded oxigraph store (the uploaded knowledge base)
/// and by remote HTTP endpoints (external knowledge sources). Callers treat
/// every implementation as potentially slow and failure-prone.
pub trait TripleStore: Send + Sync {
    /// Execute a SELECT query, returning all solution rows.
    fn select(&self, sparql: &str) -> StoreResult<Vec<BindingRow>>;

    /// Execute an update (INSERT/DELETE) operation.
    fn update(&self, sparql: &str) -> StoreResult<()>;
}

/// Convert `?subject ?predicate ?object` rows into search results.
///
/// Rows missing any of the three variables are skipped.
pub fn rows_to_results(rows: Vec<BindingRow>) -> Vec<SearchResult> {
    rows.into_iter()
        .filter_map(|mut row| {
            let subject = row.remove("subject")?;
            let predicate = row.remove("predicate")?;
            let object = row.remove("object")?;
            let mut triple = Triple::new(subject.value, predicate.value, object.value);
            triple.language = object.language;
            Some(SearchResult::from_triple(triple))
        })
        .collect()
}
