//! Rich diagnostic error types for the ontosearch engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Retrieval strategies and
//! cache tiers absorb upstream failures internally; only truly-empty results and
//! malformed input surface to callers of the public search API.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the ontosearch engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, sources) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum OntoError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] TripleStoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Triple store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TripleStoreError {
    #[error("SPARQL endpoint timed out: {endpoint}")]
    #[diagnostic(
        code(onto::store::timeout),
        help(
            "The remote SPARQL endpoint did not answer within its time budget. \
             Timed-out requests are not retried; the resolver degrades to the \
             persisted cache and then the offline snapshot."
        )
    )]
    UpstreamTimeout { endpoint: String },

    #[error("SPARQL endpoint unreachable: {endpoint}: {message}")]
    #[diagnostic(
        code(onto::store::unreachable),
        help(
            "Connection refused or DNS failure. Check network connectivity; \
             cached and offline tiers will serve results in the meantime."
        )
    )]
    UpstreamUnavailable { endpoint: String, message: String },

    #[error("SPARQL query error: {message}")]
    #[diagnostic(
        code(onto::store::sparql),
        help("The SPARQL query failed. Check the query syntax and that the store is initialized.")
    )]
    Sparql { message: String },

    #[error("malformed SPARQL response: {message}")]
    #[diagnostic(
        code(onto::store::bad_response),
        help(
            "The endpoint answered with something other than \
             application/sparql-results+json. Verify the endpoint URL points at \
             a SPARQL query service, not a landing page."
        )
    )]
    BadResponse { message: String },
}

// ---------------------------------------------------------------------------
// Cache errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CacheError {
    #[error("no results for \"{key}\" from any tier (online, cache, offline)")]
    #[diagnostic(
        code(onto::cache::no_results),
        help(
            "The live fetch failed, no cache entry matched the key, and the \
             offline snapshot had no hits. This is the only hard failure the \
             resolver produces; anything else degrades to a cheaper tier."
        )
    )]
    NoResults { key: String },

    #[error("cache entry not found: {key}")]
    #[diagnostic(
        code(onto::cache::not_found),
        help("No cache entry exists under this key. Run a search first to populate it.")
    )]
    EntryNotFound { key: String },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(onto::cache::redb),
        help(
            "The embedded cache database encountered a transaction error. \
             This may indicate corruption; try a fresh data directory."
        )
    )]
    Redb { message: String },

    #[error("cache serialization error: {message}")]
    #[diagnostic(
        code(onto::cache::serde),
        help(
            "Failed to serialize or deserialize a cache entry. The stored \
             format may have changed between versions; clear the cache directory."
        )
    )]
    Serialization { message: String },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(onto::cache::io),
        help("Check that the data directory exists, has correct permissions, and the disk is not full.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Offline index errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IndexError {
    #[error("corpus file error: {path}: {message}")]
    #[diagnostic(
        code(onto::index::corpus),
        help(
            "A per-language corpus snapshot could not be read or parsed. \
             Each file must be a JSON array of harvested entries \
             (uri, label, abstract, ...)."
        )
    )]
    Corpus { path: String, message: String },

    #[error("no corpus loaded for language \"{language}\"")]
    #[diagnostic(
        code(onto::index::no_language),
        help("Place a <language>.json snapshot in the corpus directory and restart.")
    )]
    UnknownLanguage { language: String },
}

// ---------------------------------------------------------------------------
// Translation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TranslateError {
    #[error("translation service unavailable: {message}")]
    #[diagnostic(
        code(onto::translate::unavailable),
        help(
            "The live translation service could not be reached. The static \
             dictionary and the translation cache keep working without it."
        )
    )]
    ServiceUnavailable { message: String },

    #[error("translation request failed: {message}")]
    #[diagnostic(
        code(onto::translate::request),
        help("The translation HTTP request failed or returned an unexpected payload.")
    )]
    Request { message: String },
}

// ---------------------------------------------------------------------------
// Embedding errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EmbedError {
    #[error("embedding backend unavailable")]
    #[diagnostic(
        code(onto::embed::unavailable),
        help(
            "The embedding backend failed its startup health check. Vector \
             similarity search is disabled for this process; pattern and \
             expansion strategies still run."
        )
    )]
    BackendUnavailable,

    #[error("embedding request failed: {message}")]
    #[diagnostic(
        code(onto::embed::request),
        help("The embed call failed or returned a malformed vector.")
    )]
    Request { message: String },

    #[error("vector index error: {message}")]
    #[diagnostic(
        code(onto::embed::hnsw),
        help("The HNSW vector index encountered an internal error.")
    )]
    Hnsw { message: String },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    #[diagnostic(
        code(onto::embed::dim_mismatch),
        help(
            "All vectors in the index must share the embedding model's \
             dimension. Re-embed the mismatched text with the configured model."
        )
    )]
    DimensionMismatch { expected: usize, actual: usize },
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("malformed query: {message}")]
    #[diagnostic(
        code(onto::engine::malformed_query),
        help("Queries must contain at least one non-whitespace character.")
    )]
    MalformedQuery { message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(onto::engine::invalid_config),
        help("Check the EngineConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("data directory error: {path}")]
    #[diagnostic(
        code(onto::engine::data_dir),
        help("The data directory could not be accessed. Ensure the path exists with read/write permissions.")
    )]
    DataDir { path: String },
}

/// Convenience alias for functions returning ontosearch results.
pub type OntoResult<T> = std::result::Result<T, OntoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_to_onto_error() {
        let err = TripleStoreError::UpstreamTimeout {
            endpoint: "https://dbpedia.org/sparql".into(),
        };
        let onto: OntoError = err.into();
        assert!(matches!(
            onto,
            OntoError::Store(TripleStoreError::UpstreamTimeout { .. })
        ));
    }

    #[test]
    fn cache_error_converts_to_onto_error() {
        let err = CacheError::NoResults {
            key: "heist_es".into(),
        };
        let onto: OntoError = err.into();
        assert!(matches!(onto, OntoError::Cache(CacheError::NoResults { .. })));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = CacheError::NoResults {
            key: "heist_es".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("heist_es"));
        assert!(msg.contains("offline"));
    }
}
