//! Tiered fallback resolution: live service → persisted cache → offline index.
//!
//! Each tier is strictly cheaper and less fresh than the previous one, and is
//! only consulted when the previous tier definitively failed or returned
//! empty — never speculatively in parallel (predictable cost/latency ordering
//! beats racing). The only hard failure is all three tiers coming up empty.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CacheError;
use crate::index::InvertedIndex;
use crate::model::{now_epoch_secs, CacheEntry, CachedResource};
use crate::sparql::StoreResult;

use super::store::{CacheResult, CacheStore};

/// Which tier actually served a resolved payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Online,
    Cache,
    Offline,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Source::Online => "online",
            Source::Cache => "cache",
            Source::Offline => "offline",
        };
        f.write_str(name)
    }
}

/// A payload plus the provenance of the tier that produced it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub source: Source,
    pub payload: Vec<CachedResource>,
    pub verified: bool,
}

/// Decides whether a stale payload and a fresh payload describe the same
/// upstream state during re-verification.
pub trait ConsistencyPolicy: Send + Sync {
    fn consistent(&self, cached: &[CachedResource], fresh: &[CachedResource]) -> bool;
}

/// Default policy: payload lengths within `max_len_delta` and at least
/// `min_uri_matches` of the first `probe_len` URIs shared.
///
/// The thresholds are heuristic; swap the policy rather than tuning them
/// in place.
#[derive(Debug, Clone)]
pub struct UriOverlapPolicy {
    pub max_len_delta: usize,
    pub min_uri_matches: usize,
    pub probe_len: usize,
}

impl Default for UriOverlapPolicy {
    fn default() -> Self {
        Self {
            max_len_delta: 3,
            min_uri_matches: 2,
            probe_len: 3,
        }
    }
}

impl ConsistencyPolicy for UriOverlapPolicy {
    fn consistent(&self, cached: &[CachedResource], fresh: &[CachedResource]) -> bool {
        if cached.is_empty() && fresh.is_empty() {
            return true;
        }
        if cached.len().abs_diff(fresh.len()) > self.max_len_delta {
            return false;
        }

        let fresh_uris: Vec<&str> = fresh
            .iter()
            .take(self.probe_len)
            .map(|r| r.uri.as_str())
            .collect();
        let matches = cached
            .iter()
            .take(self.probe_len)
            .filter(|r| fresh_uris.contains(&r.uri.as_str()))
            .count();

        matches >= self.min_uri_matches
    }
}

/// Aggregate cache/offline statistics for the `stats` operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResolverStats {
    pub total_cached: usize,
    pub verified_count: usize,
    pub unverified_count: usize,
    pub by_category: HashMap<String, usize>,
    pub offline_corpus_size: usize,
}

/// The three-tier fallback resolver shared by every external dependency.
pub struct TieredResolver {
    cache: Arc<CacheStore>,
    index: Arc<InvertedIndex>,
    policy: Box<dyn ConsistencyPolicy>,
}

impl TieredResolver {
    pub fn new(cache: Arc<CacheStore>, index: Arc<InvertedIndex>) -> Self {
        Self {
            cache,
            index,
            policy: Box::new(UriOverlapPolicy::default()),
        }
    }

    /// Replace the re-verification consistency policy.
    pub fn with_policy(mut self, policy: Box<dyn ConsistencyPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve a query through the tiers, recording which one served it.
    ///
    /// On a live success the payload is persisted best-effort (an upsert
    /// failure is logged, not propagated). Offline payloads are never marked
    /// verified: snapshot data is not freshly confirmed.
    pub fn resolve_with_fallback<F>(
        &self,
        query: &str,
        language: &str,
        live_fetch: F,
    ) -> CacheResult<Resolved>
    where
        F: FnOnce() -> StoreResult<Vec<CachedResource>>,
    {
        let key = cache_key(query, language);

        // Tier 1: live service.
        match live_fetch() {
            Ok(payload) if !payload.is_empty() => {
                let entry = CacheEntry::fresh(&key, payload.clone());
                if let Err(e) = self.cache.upsert(&entry) {
                    tracing::warn!(key = %key, error = %e, "failed to persist live results");
                }
                tracing::debug!(key = %key, results = payload.len(), "served from live source");
                return Ok(Resolved {
                    source: Source::Online,
                    payload,
                    verified: true,
                });
            }
            Ok(_) => {
                tracing::debug!(key = %key, "live source returned empty, trying cache");
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "live fetch failed, trying cache");
            }
        }

        // Tier 2: persisted cache, exact key first, then fuzzy.
        if let Some(entry) = self.lookup_cache(&key, query)? {
            if !entry.payload.is_empty() {
                tracing::debug!(key = %key, matched = %entry.key, "served from cache");
                return Ok(Resolved {
                    source: Source::Cache,
                    verified: entry.verified,
                    payload: entry.payload,
                });
            }
        }

        // Tier 3: offline snapshot.
        let offline = self.search_offline(query, language);
        if !offline.is_empty() {
            tracing::debug!(key = %key, results = offline.len(), "served from offline snapshot");
            return Ok(Resolved {
                source: Source::Offline,
                payload: offline,
                verified: false,
            });
        }

        Err(CacheError::NoResults { key })
    }

    fn lookup_cache(&self, key: &str, query: &str) -> CacheResult<Option<CacheEntry>> {
        if let Some(entry) = self.cache.get(key)? {
            return Ok(Some(entry));
        }
        Ok(self.cache.find_containing(query)?.into_iter().next())
    }

    /// Query the offline index directly (also exposed as a public operation).
    pub fn search_offline(&self, query: &str, language: &str) -> Vec<CachedResource> {
        self.index
            .search(query, language)
            .into_iter()
            .map(|indexed| CachedResource {
                uri: indexed.entry.uri.clone(),
                label: indexed.entry.label.clone(),
                r#abstract: indexed.entry.r#abstract.clone(),
                kind: indexed.entry.genre.clone(),
            })
            .collect()
    }

    /// Re-verify a cache entry against a fresh live fetch.
    ///
    /// The entry's original query (language suffix stripped) is re-fetched and
    /// compared under the consistency policy. Consistent: the entry is marked
    /// verified and its payload replaced with the fresh one. Inconsistent: the
    /// stale payload is kept, never destructively overwritten, and the entry
    /// stays unverified. Applies to entries regardless of which tier
    /// originally populated them.
    pub fn verify<F>(&self, key: &str, live_fetch: F) -> CacheResult<bool>
    where
        F: FnOnce(&str) -> StoreResult<Vec<CachedResource>>,
    {
        let mut entry = self
            .cache
            .get(key)?
            .ok_or_else(|| CacheError::EntryNotFound { key: key.into() })?;

        let original_query = strip_language_suffix(&entry.key);
        let fresh = match live_fetch(original_query) {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "verification fetch failed");
                return Ok(false);
            }
        };

        let consistent = self.policy.consistent(&entry.payload, &fresh);
        entry.verified = consistent;
        entry.last_verified = now_epoch_secs();
        if consistent {
            entry.payload = fresh;
        }
        self.cache.upsert(&entry)?;

        Ok(consistent)
    }

    /// Cache and offline-corpus statistics.
    pub fn stats(&self) -> CacheResult<ResolverStats> {
        let (total, verified, by_category) = self.cache.counts()?;
        Ok(ResolverStats {
            total_cached: total,
            verified_count: verified,
            unverified_count: total - verified,
            by_category,
            offline_corpus_size: self.index.corpus_size(),
        })
    }
}

impl std::fmt::Debug for TieredResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredResolver").finish()
    }
}

/// `"<query>_<language>"` cache key.
pub fn cache_key(query: &str, language: &str) -> String {
    format!("{query}_{language}")
}

/// Strip a trailing `_xx` two-letter language suffix, if present.
fn strip_language_suffix(key: &str) -> &str {
    match key.rsplit_once('_') {
        Some((query, suffix))
            if suffix.len() == 2 && suffix.chars().all(|c| c.is_ascii_lowercase()) =>
        {
            query
        }
        _ => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::error::TripleStoreError;
    use crate::model::CorpusEntry;
    use tempfile::TempDir;

    fn resource(uri: &str) -> CachedResource {
        CachedResource {
            uri: uri.into(),
            label: uri.into(),
            r#abstract: String::new(),
            kind: String::new(),
        }
    }

    fn failing_fetch() -> StoreResult<Vec<CachedResource>> {
        Err(TripleStoreError::UpstreamTimeout {
            endpoint: "https://dbpedia.org/sparql".into(),
        })
    }

    fn resolver_with(
        dir: &TempDir,
        corpus_entries: Vec<CorpusEntry>,
    ) -> (TieredResolver, Arc<CacheStore>) {
        let cache = Arc::new(CacheStore::open(dir.path()).unwrap());
        let corpus = Corpus::from_entries("en", corpus_entries);
        let index = Arc::new(InvertedIndex::build(Arc::new(corpus)));
        (TieredResolver::new(Arc::clone(&cache), index), cache)
    }

    fn breaking_bad() -> CorpusEntry {
        CorpusEntry {
            uri: "u1".into(),
            label: "Breaking Bad".into(),
            r#abstract: "a chemistry teacher".into(),
            genre: "Drama".into(),
            ..Default::default()
        }
    }

    #[test]
    fn online_success_persists_and_reports_online() {
        let dir = TempDir::new().unwrap();
        let (resolver, cache) = resolver_with(&dir, vec![]);

        let resolved = resolver
            .resolve_with_fallback("heist", "es", || Ok(vec![resource("http://x/1")]))
            .unwrap();

        assert_eq!(resolved.source, Source::Online);
        assert!(resolved.verified);
        assert_eq!(resolved.payload.len(), 1);

        let persisted = cache.get("heist_es").unwrap().unwrap();
        assert!(persisted.verified);
        assert_eq!(persisted.confidence, 1.0);
    }

    #[test]
    fn cache_tier_serves_when_live_fails() {
        let dir = TempDir::new().unwrap();
        let (resolver, cache) = resolver_with(&dir, vec![]);

        cache
            .upsert(&CacheEntry::fresh("heist_es", vec![resource("http://x/1")]))
            .unwrap();

        let resolved = resolver
            .resolve_with_fallback("heist", "es", failing_fetch)
            .unwrap();
        assert_eq!(resolved.source, Source::Cache);
        assert!(resolved.verified);
        assert_eq!(resolved.payload[0].uri, "http://x/1");
    }

    #[test]
    fn fuzzy_cache_match_when_exact_key_missing() {
        let dir = TempDir::new().unwrap();
        let (resolver, cache) = resolver_with(&dir, vec![]);

        cache
            .upsert(&CacheEntry::fresh("the great heist_es", vec![resource("http://x/f")]))
            .unwrap();

        let resolved = resolver
            .resolve_with_fallback("heist", "en", failing_fetch)
            .unwrap();
        assert_eq!(resolved.source, Source::Cache);
        assert_eq!(resolved.payload[0].uri, "http://x/f");
    }

    #[test]
    fn offline_tier_is_never_verified() {
        let dir = TempDir::new().unwrap();
        let (resolver, _) = resolver_with(&dir, vec![breaking_bad()]);

        let resolved = resolver
            .resolve_with_fallback("bad", "en", failing_fetch)
            .unwrap();
        assert_eq!(resolved.source, Source::Offline);
        assert!(!resolved.verified);
        assert_eq!(resolved.payload.len(), 1);
        assert_eq!(resolved.payload[0].uri, "u1");
        assert_eq!(resolved.payload[0].kind, "Drama");
    }

    #[test]
    fn all_tiers_empty_is_no_results() {
        let dir = TempDir::new().unwrap();
        let (resolver, _) = resolver_with(&dir, vec![]);

        let err = resolver
            .resolve_with_fallback("nothing", "en", failing_fetch)
            .unwrap_err();
        assert!(matches!(err, CacheError::NoResults { key } if key == "nothing_en"));
    }

    #[test]
    fn resolution_is_idempotent_when_live_keeps_failing() {
        let dir = TempDir::new().unwrap();
        let (resolver, cache) = resolver_with(&dir, vec![breaking_bad()]);

        cache
            .upsert(&CacheEntry::fresh("heist_es", vec![resource("http://x/1")]))
            .unwrap();

        for query in ["heist", "bad"] {
            let first = resolver
                .resolve_with_fallback(query, if query == "heist" { "es" } else { "en" }, failing_fetch)
                .unwrap();
            let second = resolver
                .resolve_with_fallback(query, if query == "heist" { "es" } else { "en" }, failing_fetch)
                .unwrap();
            assert_eq!(first.source, second.source);
            assert_eq!(first.payload, second.payload);
        }
    }

    #[test]
    fn verify_consistent_replaces_payload() {
        let dir = TempDir::new().unwrap();
        let (resolver, cache) = resolver_with(&dir, vec![]);

        let mut entry = CacheEntry::fresh(
            "heist_es",
            vec![resource("http://x/1"), resource("http://x/2"), resource("http://x/3")],
        );
        entry.verified = false;
        cache.upsert(&entry).unwrap();

        let fresh = vec![resource("http://x/1"), resource("http://x/2"), resource("http://x/9")];
        let fresh_clone = fresh.clone();
        let ok = resolver
            .verify("heist_es", move |query| {
                assert_eq!(query, "heist"); // language suffix stripped
                Ok(fresh_clone)
            })
            .unwrap();

        assert!(ok);
        let updated = cache.get("heist_es").unwrap().unwrap();
        assert!(updated.verified);
        assert_eq!(updated.payload, fresh);
    }

    #[test]
    fn verify_inconsistent_keeps_stale_payload() {
        let dir = TempDir::new().unwrap();
        let (resolver, cache) = resolver_with(&dir, vec![]);

        let original = vec![resource("http://x/1"), resource("http://x/2"), resource("http://x/3")];
        cache.upsert(&CacheEntry::fresh("heist_es", original.clone())).unwrap();

        let ok = resolver
            .verify("heist_es", |_| Ok(vec![resource("http://y/a"), resource("http://y/b")]))
            .unwrap();

        assert!(!ok);
        let updated = cache.get("heist_es").unwrap().unwrap();
        assert!(!updated.verified);
        assert_eq!(updated.payload, original);
    }

    #[test]
    fn verify_fetch_failure_returns_false() {
        let dir = TempDir::new().unwrap();
        let (resolver, cache) = resolver_with(&dir, vec![]);
        cache.upsert(&CacheEntry::fresh("heist_es", vec![resource("u")])).unwrap();

        let ok = resolver.verify("heist_es", |_| failing_fetch()).unwrap();
        assert!(!ok);
    }

    #[test]
    fn verify_missing_entry_is_an_error() {
        let dir = TempDir::new().unwrap();
        let (resolver, _) = resolver_with(&dir, vec![]);
        assert!(matches!(
            resolver.verify("missing_en", |_| Ok(vec![])),
            Err(CacheError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn policy_tolerates_small_length_delta() {
        let policy = UriOverlapPolicy::default();
        let cached = vec![resource("a"), resource("b"), resource("c")];
        let mut fresh = cached.clone();
        fresh.push(resource("d"));
        fresh.push(resource("e"));
        assert!(policy.consistent(&cached, &fresh));

        let too_many: Vec<_> = (0..8).map(|i| resource(&format!("u{i}"))).collect();
        assert!(!policy.consistent(&cached, &too_many));
    }

    #[test]
    fn policy_both_empty_is_consistent() {
        let policy = UriOverlapPolicy::default();
        assert!(policy.consistent(&[], &[]));
    }

    #[test]
    fn stats_combine_cache_and_corpus() {
        let dir = TempDir::new().unwrap();
        let (resolver, cache) = resolver_with(&dir, vec![breaking_bad()]);
        cache.upsert(&CacheEntry::fresh("heist_es", vec![resource("u")])).unwrap();

        let stats = resolver.stats().unwrap();
        assert_eq!(stats.total_cached, 1);
        assert_eq!(stats.verified_count, 1);
        assert_eq!(stats.unverified_count, 0);
        assert_eq!(stats.offline_corpus_size, 1);
    }
}
