//! Persisted cache of external query results, backed by redb.
//!
//! One transactional table maps `"<query>_<language>"` keys to serialized
//! [`CacheEntry`] records. Writes are upsert-only; entries are never deleted
//! by the engine (deletion is an administrative concern). Concurrent upserts
//! on distinct keys need no coordination, and last-write-wins on identical
//! keys is acceptable since entries are idempotent derivations of the same
//! upstream source.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::error::CacheError;
use crate::model::CacheEntry;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Table of cached external query results (string keys → bincode values).
const RESULTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("external_results");

/// Table of cached translations (string keys → translated text).
const TRANSLATIONS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("translations");

/// Table of cached text embeddings (string keys → bincode f32 vectors).
const EMBEDDINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("embeddings");

/// Persisted cache store shared by the resolver, translator, and embedder.
pub struct CacheStore {
    db: Arc<Database>,
}

impl CacheStore {
    /// Open or create the cache database in the given directory.
    pub fn open(data_dir: &Path) -> CacheResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| CacheError::Io { source: e })?;
        let db_path = data_dir.join("ontosearch.redb");
        let db = Database::create(&db_path).map_err(|e| CacheError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Open all tables once so later read transactions never hit
    /// a missing-table error on a fresh database.
    fn ensure_tables(&self) -> CacheResult<()> {
        let txn = self.db.begin_write().map_err(|e| CacheError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            txn.open_table(RESULTS_TABLE).map_err(|e| CacheError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            txn.open_table(TRANSLATIONS_TABLE)
                .map_err(|e| CacheError::Redb {
                    message: format!("open_table failed: {e}"),
                })?;
            txn.open_table(EMBEDDINGS_TABLE).map_err(|e| CacheError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
        }
        txn.commit().map_err(|e| CacheError::Redb {
            message: format!("commit failed: {e}"),
        })
    }

    /// Insert or replace the entry stored under its key.
    pub fn upsert(&self, entry: &CacheEntry) -> CacheResult<()> {
        let encoded = bincode::serialize(entry).map_err(|e| CacheError::Serialization {
            message: format!("failed to serialize cache entry: {e}"),
        })?;

        let txn = self.db.begin_write().map_err(|e| CacheError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            let mut table = txn.open_table(RESULTS_TABLE).map_err(|e| CacheError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            table
                .insert(entry.key.as_str(), encoded.as_slice())
                .map_err(|e| CacheError::Redb {
                    message: format!("insert failed: {e}"),
                })?;
        }
        txn.commit().map_err(|e| CacheError::Redb {
            message: format!("commit failed: {e}"),
        })
    }

    /// Look up an entry by exact key.
    pub fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let txn = self.db.begin_read().map_err(|e| CacheError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = txn.open_table(RESULTS_TABLE).map_err(|e| CacheError::Redb {
            message: format!("open_table failed: {e}"),
        })?;
        let Some(guard) = table.get(key).map_err(|e| CacheError::Redb {
            message: format!("get failed: {e}"),
        })?
        else {
            return Ok(None);
        };
        let entry = bincode::deserialize(guard.value()).map_err(|e| CacheError::Serialization {
            message: format!("failed to deserialize cache entry: {e}"),
        })?;
        Ok(Some(entry))
    }

    /// Fuzzy lookup: entries whose key contains the needle
    /// (case-insensitively), most recently verified first.
    pub fn find_containing(&self, needle: &str) -> CacheResult<Vec<CacheEntry>> {
        let needle_lower = needle.to_lowercase();
        let mut hits: Vec<CacheEntry> = self
            .all_entries()?
            .into_iter()
            .filter(|entry| entry.key.to_lowercase().contains(&needle_lower))
            .collect();
        hits.sort_by(|a, b| b.last_verified.cmp(&a.last_verified));
        Ok(hits)
    }

    /// Every stored entry, in key order.
    pub fn all_entries(&self) -> CacheResult<Vec<CacheEntry>> {
        let txn = self.db.begin_read().map_err(|e| CacheError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = txn.open_table(RESULTS_TABLE).map_err(|e| CacheError::Redb {
            message: format!("open_table failed: {e}"),
        })?;

        let mut entries = Vec::new();
        let iter = table.iter().map_err(|e| CacheError::Redb {
            message: format!("iter failed: {e}"),
        })?;
        for item in iter {
            let (_, value) = item.map_err(|e| CacheError::Redb {
                message: format!("cursor failed: {e}"),
            })?;
            let entry =
                bincode::deserialize(value.value()).map_err(|e| CacheError::Serialization {
                    message: format!("failed to deserialize cache entry: {e}"),
                })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// `(total, verified, by-category)` counts over all stored entries.
    pub fn counts(&self) -> CacheResult<(usize, usize, HashMap<String, usize>)> {
        let entries = self.all_entries()?;
        let total = entries.len();
        let verified = entries.iter().filter(|e| e.verified).count();
        let mut by_category: HashMap<String, usize> = HashMap::new();
        for entry in &entries {
            *by_category.entry(entry.category.clone()).or_default() += 1;
        }
        Ok((total, verified, by_category))
    }

    // -- translation cache ---------------------------------------------------

    /// Store a translation under `(text, target language)`.
    pub fn put_translation(&self, text: &str, target_lang: &str, translated: &str) -> CacheResult<()> {
        let key = translation_key(text, target_lang);
        let txn = self.db.begin_write().map_err(|e| CacheError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            let mut table = txn
                .open_table(TRANSLATIONS_TABLE)
                .map_err(|e| CacheError::Redb {
                    message: format!("open_table failed: {e}"),
                })?;
            table.insert(key.as_str(), translated).map_err(|e| CacheError::Redb {
                message: format!("insert failed: {e}"),
            })?;
        }
        txn.commit().map_err(|e| CacheError::Redb {
            message: format!("commit failed: {e}"),
        })
    }

    /// Look up a cached translation.
    pub fn get_translation(&self, text: &str, target_lang: &str) -> CacheResult<Option<String>> {
        let key = translation_key(text, target_lang);
        let txn = self.db.begin_read().map_err(|e| CacheError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = txn
            .open_table(TRANSLATIONS_TABLE)
            .map_err(|e| CacheError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
        let guard = table.get(key.as_str()).map_err(|e| CacheError::Redb {
            message: format!("get failed: {e}"),
        })?;
        Ok(guard.map(|g| g.value().to_string()))
    }

    /// Number of cached translations.
    pub fn translation_count(&self) -> CacheResult<usize> {
        let txn = self.db.begin_read().map_err(|e| CacheError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = txn
            .open_table(TRANSLATIONS_TABLE)
            .map_err(|e| CacheError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
        table
            .len()
            .map(|n| n as usize)
            .map_err(|e| CacheError::Redb {
                message: format!("len failed: {e}"),
            })
    }

    // -- embedding cache -----------------------------------------------------

    /// Store an embedding vector under `(model, text)`.
    pub fn put_embedding(&self, model: &str, text: &str, vector: &[f32]) -> CacheResult<()> {
        let key = embedding_key(model, text);
        let encoded = bincode::serialize(vector).map_err(|e| CacheError::Serialization {
            message: format!("failed to serialize embedding: {e}"),
        })?;
        let txn = self.db.begin_write().map_err(|e| CacheError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            let mut table = txn.open_table(EMBEDDINGS_TABLE).map_err(|e| CacheError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            table
                .insert(key.as_str(), encoded.as_slice())
                .map_err(|e| CacheError::Redb {
                    message: format!("insert failed: {e}"),
                })?;
        }
        txn.commit().map_err(|e| CacheError::Redb {
            message: format!("commit failed: {e}"),
        })
    }

    /// Look up a cached embedding vector.
    pub fn get_embedding(&self, model: &str, text: &str) -> CacheResult<Option<Vec<f32>>> {
        let key = embedding_key(model, text);
        let txn = self.db.begin_read().map_err(|e| CacheError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = txn.open_table(EMBEDDINGS_TABLE).map_err(|e| CacheError::Redb {
            message: format!("open_table failed: {e}"),
        })?;
        let Some(guard) = table.get(key.as_str()).map_err(|e| CacheError::Redb {
            message: format!("get failed: {e}"),
        })?
        else {
            return Ok(None);
        };
        let vector = bincode::deserialize(guard.value()).map_err(|e| CacheError::Serialization {
            message: format!("failed to deserialize embedding: {e}"),
        })?;
        Ok(Some(vector))
    }
}

fn translation_key(text: &str, target_lang: &str) -> String {
    format!("{target_lang}\u{1f}{text}")
}

fn embedding_key(model: &str, text: &str) -> String {
    format!("{model}\u{1f}{text}")
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CachedResource;
    use tempfile::TempDir;

    fn resource(uri: &str) -> CachedResource {
        CachedResource {
            uri: uri.into(),
            label: uri.into(),
            r#abstract: String::new(),
            kind: String::new(),
        }
    }

    #[test]
    fn upsert_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();

        let entry = CacheEntry::fresh("heist_es", vec![resource("http://x/1")]);
        store.upsert(&entry).unwrap();

        let loaded = store.get("heist_es").unwrap().unwrap();
        assert_eq!(loaded.payload.len(), 1);
        assert!(loaded.verified);
        assert!(store.get("missing_en").unwrap().is_none());
    }

    #[test]
    fn upsert_replaces_existing_entry() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();

        store
            .upsert(&CacheEntry::fresh("heist_es", vec![resource("http://x/1")]))
            .unwrap();
        store
            .upsert(&CacheEntry::fresh(
                "heist_es",
                vec![resource("http://x/1"), resource("http://x/2")],
            ))
            .unwrap();

        let loaded = store.get("heist_es").unwrap().unwrap();
        assert_eq!(loaded.payload.len(), 2);
        assert_eq!(store.counts().unwrap().0, 1);
    }

    #[test]
    fn fuzzy_find_orders_by_last_verified() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();

        let mut old = CacheEntry::fresh("heist movie_es", vec![resource("http://x/old")]);
        old.last_verified = 100;
        let mut new = CacheEntry::fresh("great heist_es", vec![resource("http://x/new")]);
        new.last_verified = 200;
        store.upsert(&old).unwrap();
        store.upsert(&new).unwrap();

        let hits = store.find_containing("HEIST").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].key, "great heist_es");
    }

    #[test]
    fn counts_track_verified_and_category() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();

        let verified = CacheEntry::fresh("breaking bad tv series_en", vec![]);
        let mut unverified = CacheEntry::fresh("obscure_en", vec![]);
        unverified.verified = false;
        store.upsert(&verified).unwrap();
        store.upsert(&unverified).unwrap();

        let (total, verified_count, by_category) = store.counts().unwrap();
        assert_eq!(total, 2);
        assert_eq!(verified_count, 1);
        assert_eq!(by_category.get("tv_series"), Some(&1));
        assert_eq!(by_category.get("other"), Some(&1));
    }

    #[test]
    fn translation_cache_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();

        store.put_translation("money heist", "es", "la casa de papel").unwrap();
        assert_eq!(
            store.get_translation("money heist", "es").unwrap().as_deref(),
            Some("la casa de papel")
        );
        assert!(store.get_translation("money heist", "pt").unwrap().is_none());
        assert_eq!(store.translation_count().unwrap(), 1);
    }

    #[test]
    fn embedding_cache_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();

        let vector = vec![0.1_f32, 0.2, 0.3];
        store.put_embedding("minilm", "heist", &vector).unwrap();
        assert_eq!(store.get_embedding("minilm", "heist").unwrap(), Some(vector));
        assert!(store.get_embedding("other-model", "heist").unwrap().is_none());
    }

    #[test]
    fn persistence_across_reopens() {
        let dir = TempDir::new().unwrap();
        {
            let store = CacheStore::open(dir.path()).unwrap();
            store
                .upsert(&CacheEntry::fresh("persist_en", vec![resource("http://x/1")]))
                .unwrap();
        }
        let store = CacheStore::open(dir.path()).unwrap();
        assert!(store.get("persist_en").unwrap().is_some());
    }
}
