//! Persistence and tiered fallback resolution.
//!
//! [`store::CacheStore`] is the redb-backed durable cache (results,
//! translations, embeddings). [`resolver::TieredResolver`] layers the
//! live-source → cache → offline-index fallback on top of it.

pub mod resolver;
pub mod store;

pub use resolver::{cache_key, ConsistencyPolicy, Resolved, ResolverStats, Source, TieredResolver, UriOverlapPolicy};
pub use store::{CacheResult, CacheStore};
