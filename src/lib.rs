//! # ontosearch
//!
//! A resilient multi-source semantic search engine over RDF triples.
//!
//! ## Architecture
//!
//! - **SPARQL layer** (`sparql`): query builders plus local (oxigraph) and
//!   remote (HTTP) triple stores behind one trait
//! - **Tiered cache** (`cache`): live source → redb-persisted cache → offline
//!   snapshot, with provenance tags and re-verification
//! - **Offline index** (`corpus`, `index`): per-language corpus snapshots with
//!   an inverted keyword index for sub-linear lookup
//! - **Ranking** (`rank`): BM25 with match-type and position boosts,
//!   normalized so the top result scores 1.0
//! - **Query expansion** (`expand`): synonyms, stem variants, concepts, and
//!   graph-related terms compiled into one disjunctive query
//! - **Vector search** (`embed`): HNSW cosine-similarity retrieval over an
//!   external embedding backend, probed once at startup
//! - **Translation** (`translate`): static dictionary → cache → live service
//! - **Orchestration** (`search`): concurrent strategies, dedup, rank
//!
//! ## Library usage
//!
//! ```no_run
//! use ontosearch::config::EngineConfig;
//! use ontosearch::search::{SearchEngine, SearchOptions};
//!
//! let engine = SearchEngine::from_config(&EngineConfig::default()).unwrap();
//! engine.insert_triple("http://kb/BreakingBad", "http://kb/genre", "Crime drama").unwrap();
//! let results = engine.search("crime series", &SearchOptions::default()).unwrap();
//! ```

pub mod cache;
pub mod config;
pub mod corpus;
pub mod embed;
pub mod error;
pub mod expand;
pub mod index;
pub mod model;
pub mod rank;
pub mod search;
pub mod sparql;
pub mod translate;
