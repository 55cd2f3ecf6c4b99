//! Offline corpus snapshots: one JSON array of harvested entries per language.
//!
//! Snapshots live in a well-known directory (`{dir}/{lang}.json`) and are loaded
//! once at process start. The snapshot is the source of truth; everything built
//! on top (lowered text, keywords, the inverted index) is a disposable
//! acceleration structure rebuilt on every start.

use std::collections::HashMap;
use std::path::Path;

use crate::error::IndexError;
use crate::model::{CorpusEntry, IndexedEntry};

/// Result type for corpus/index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Minimum keyword length; shorter tokens never enter the index.
pub const MIN_TOKEN_LEN: usize = 3;

/// At most this many keywords are registered per entry.
pub const MAX_KEYWORDS_PER_ENTRY: usize = 10;

/// Split text on whitespace/punctuation into lower-cased tokens of at least
/// [`MIN_TOKEN_LEN`] characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

/// Prepare a raw corpus entry for search.
pub fn index_entry(entry: CorpusEntry) -> IndexedEntry {
    let label_lower = entry.label.to_lowercase();
    let abstract_lower = entry.r#abstract.to_lowercase();
    let mut keywords = tokenize(&entry.label);
    keywords.truncate(MAX_KEYWORDS_PER_ENTRY);
    IndexedEntry {
        entry,
        label_lower,
        abstract_lower,
        keywords,
    }
}

/// All loaded per-language corpora, keyed by language code.
#[derive(Debug, Default)]
pub struct Corpus {
    languages: HashMap<String, Vec<IndexedEntry>>,
}

impl Corpus {
    /// Load every `{lang}.json` snapshot found in the directory.
    ///
    /// A missing directory yields an empty corpus (offline data is optional);
    /// an unreadable or unparsable snapshot is an error.
    pub fn load_dir(dir: &Path) -> IndexResult<Self> {
        let mut languages = HashMap::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => {
                tracing::warn!(dir = %dir.display(), "corpus directory missing, offline tier empty");
                return Ok(Self { languages });
            }
        };

        for dir_entry in entries.flatten() {
            let path = dir_entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = std::fs::read_to_string(&path).map_err(|e| IndexError::Corpus {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            let parsed: Vec<CorpusEntry> =
                serde_json::from_str(&raw).map_err(|e| IndexError::Corpus {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            tracing::info!(language = lang, entries = parsed.len(), "loaded corpus snapshot");
            languages.insert(lang.to_string(), parsed.into_iter().map(index_entry).collect());
        }

        Ok(Self { languages })
    }

    /// Build a corpus directly from entries (used by tests and embedded setups).
    pub fn from_entries(language: &str, entries: Vec<CorpusEntry>) -> Self {
        let mut languages = HashMap::new();
        languages.insert(
            language.to_string(),
            entries.into_iter().map(index_entry).collect(),
        );
        Self { languages }
    }

    /// Entries for a language, or an empty slice if that language isn't loaded.
    pub fn entries(&self, language: &str) -> &[IndexedEntry] {
        self.languages.get(language).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Loaded language codes.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    /// Total number of entries across all languages.
    pub fn len(&self) -> usize {
        self.languages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_short_tokens() {
        let tokens = tokenize("El ministerio del tiempo");
        assert_eq!(tokens, vec!["ministerio", "del", "tiempo"]);
    }

    #[test]
    fn tokenize_splits_on_punctuation() {
        let tokens = tokenize("Breaking-Bad: chemistry!");
        assert_eq!(tokens, vec!["breaking", "bad", "chemistry"]);
    }

    #[test]
    fn keywords_capped_at_ten() {
        let entry = CorpusEntry {
            uri: "u".into(),
            label: "one two three four five six seven eight nine ten eleven twelve".into(),
            ..Default::default()
        };
        let indexed = index_entry(entry);
        assert_eq!(indexed.keywords.len(), MAX_KEYWORDS_PER_ENTRY);
    }

    #[test]
    fn load_dir_reads_language_snapshots() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("en.json"),
            r#"[{"uri":"u1","label":"Breaking Bad","abstract":"a chemistry teacher"}]"#,
        )
        .unwrap();

        let corpus = Corpus::load_dir(dir.path()).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.entries("en")[0].label_lower, "breaking bad");
        assert!(corpus.entries("es").is_empty());
    }

    #[test]
    fn missing_dir_is_empty_not_error() {
        let corpus = Corpus::load_dir(Path::new("/nonexistent/corpus")).unwrap();
        assert!(corpus.is_empty());
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("en.json"), "not json").unwrap();
        assert!(Corpus::load_dir(dir.path()).is_err());
    }
}
