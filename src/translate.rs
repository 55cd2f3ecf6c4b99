//! Hybrid translation: static dictionary → persisted cache → live service.
//!
//! The same degrade-gracefully ordering as the result resolver: each tier is
//! cheaper and less capable than the next, the live service is only contacted
//! when both offline tiers miss, and a live failure falls back to returning
//! the text untranslated rather than erroring.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::error::TranslateError;

/// Result type for translation operations.
pub type TranslateResult<T> = std::result::Result<T, TranslateError>;

const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(5);
const DETECT_TIMEOUT: Duration = Duration::from_secs(3);

/// English title → Spanish title pairs of well-known TV shows.
///
/// Identity pairs are intentional: they mark titles that are not translated
/// in the other market, short-circuiting a pointless live call.
const TV_SHOWS_DICTIONARY: &[(&str, &str)] = &[
    ("the money heist", "la casa de papel"),
    ("money heist", "la casa de papel"),
    ("breaking bad", "breaking bad"),
    ("game of thrones", "juego de tronos"),
    ("stranger things", "stranger things"),
    ("the walking dead", "los muertos vivientes"),
    ("the crown", "the crown"),
    ("narcos", "narcos"),
    ("dark", "dark"),
    ("the witcher", "el brujo"),
    ("peaky blinders", "peaky blinders"),
    ("black mirror", "black mirror"),
    ("the mandalorian", "el mandaloriano"),
    ("the boys", "the boys"),
    ("westworld", "westworld"),
    ("the office", "la oficina"),
    ("friends", "friends"),
    ("how i met your mother", "cómo conocí a vuestra madre"),
    ("the big bang theory", "la teoría del big bang"),
    ("sherlock", "sherlock"),
    ("doctor who", "doctor who"),
    ("house of cards", "house of cards"),
    ("orange is the new black", "orange is the new black"),
    ("vikings", "vikingos"),
    ("the handmaid's tale", "el cuento de la criada"),
    ("chernobyl", "chernobyl"),
    ("the umbrella academy", "the umbrella academy"),
    ("lucifer", "lucifer"),
    ("the flash", "the flash"),
    ("arrow", "arrow"),
    ("supergirl", "supergirl"),
    ("riverdale", "riverdale"),
    ("13 reasons why", "por trece razones"),
    ("elite", "élite"),
    ("the marginal", "el marginal"),
    ("the kingdom", "el reino"),
    ("the ministry of time", "el ministerio del tiempo"),
];

/// Which tier produced a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationSource {
    Dictionary,
    Cache,
    Service,
}

/// A completed translation with its provenance.
#[derive(Debug, Clone)]
pub struct Translation {
    pub original: String,
    pub translated: String,
    pub target_lang: String,
    pub source: TranslationSource,
}

/// Translation cache statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TranslationStats {
    pub cached: usize,
    pub dictionary_size: usize,
}

/// Dictionary-then-cache-then-service translator.
pub struct Translator {
    cache: Arc<CacheStore>,
    service_url: Option<String>,
    to_spanish: HashMap<String, String>,
    to_english: HashMap<String, String>,
}

impl Translator {
    /// `service_url` is the base URL of a LibreTranslate-compatible service;
    /// `None` disables the live tier entirely.
    pub fn new(cache: Arc<CacheStore>, service_url: Option<String>) -> Self {
        let mut to_spanish = HashMap::new();
        let mut to_english = HashMap::new();
        for (en, es) in TV_SHOWS_DICTIONARY {
            to_spanish.insert((*en).to_string(), (*es).to_string());
            // First english form wins for the reverse direction.
            to_english
                .entry((*es).to_string())
                .or_insert_with(|| (*en).to_string());
        }
        Self {
            cache,
            service_url,
            to_spanish,
            to_english,
        }
    }

    /// Translate text into `target_lang`, falling back to the identity
    /// translation when every tier misses or fails.
    pub fn translate(&self, text: &str, target_lang: &str) -> Translation {
        let normalized = text.trim().to_lowercase();

        if let Some(hit) = self.dictionary_lookup(&normalized, target_lang) {
            tracing::debug!(text = %text, translated = %hit, "dictionary hit");
            return Translation {
                original: text.to_string(),
                translated: hit,
                target_lang: target_lang.to_string(),
                source: TranslationSource::Dictionary,
            };
        }

        match self.cache.get_translation(&normalized, target_lang) {
            Ok(Some(cached)) => {
                tracing::debug!(text = %text, translated = %cached, "translation cache hit");
                return Translation {
                    original: text.to_string(),
                    translated: cached,
                    target_lang: target_lang.to_string(),
                    source: TranslationSource::Cache,
                };
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "translation cache read failed"),
        }

        match self.translate_live(&normalized, target_lang) {
            Ok(translated) => {
                if let Err(e) = self.cache.put_translation(&normalized, target_lang, &translated) {
                    tracing::warn!(error = %e, "translation cache write failed");
                }
                Translation {
                    original: text.to_string(),
                    translated,
                    target_lang: target_lang.to_string(),
                    source: TranslationSource::Service,
                }
            }
            Err(e) => {
                tracing::warn!(text = %text, error = %e, "translation failed, keeping original");
                Translation {
                    original: text.to_string(),
                    translated: text.to_string(),
                    target_lang: target_lang.to_string(),
                    source: TranslationSource::Dictionary,
                }
            }
        }
    }

    /// The original text plus any distinct es/en translations of it.
    ///
    /// Used by multilingual search to widen one query into variants; a failed
    /// translation simply contributes no variant.
    pub fn translate_variants(&self, text: &str) -> Vec<String> {
        let mut variants = vec![text.to_string()];
        for lang in ["es", "en"] {
            let translated = self.translate(text, lang).translated;
            if translated != text && !variants.contains(&translated) {
                variants.push(translated);
            }
        }
        variants
    }

    /// Detect the text's language, live service first, diacritic heuristic
    /// as the offline fallback.
    pub fn detect_language(&self, text: &str) -> String {
        if let Some(base) = &self.service_url {
            let detected = ureq::post(&format!("{base}/detect"))
                .timeout(DETECT_TIMEOUT)
                .send_json(serde_json::json!({ "q": text }))
                .ok()
                .and_then(|r| r.into_json::<serde_json::Value>().ok())
                .and_then(|body| {
                    body.get(0)?
                        .get("language")?
                        .as_str()
                        .map(str::to_string)
                });
            if let Some(lang) = detected {
                return lang;
            }
        }

        let spanish_chars = ['á', 'é', 'í', 'ó', 'ú', 'ñ', 'ü'];
        if text.to_lowercase().chars().any(|c| spanish_chars.contains(&c)) {
            "es".to_string()
        } else {
            "en".to_string()
        }
    }

    pub fn stats(&self) -> TranslationStats {
        TranslationStats {
            cached: self.cache.translation_count().unwrap_or(0),
            dictionary_size: self.to_spanish.len(),
        }
    }

    fn dictionary_lookup(&self, normalized: &str, target_lang: &str) -> Option<String> {
        match target_lang {
            "es" => self.to_spanish.get(normalized).cloned(),
            "en" => self.to_english.get(normalized).cloned(),
            _ => None,
        }
    }

    fn translate_live(&self, text: &str, target_lang: &str) -> TranslateResult<String> {
        let base = self
            .service_url
            .as_deref()
            .ok_or_else(|| TranslateError::ServiceUnavailable {
                message: "no translation service configured".into(),
            })?;

        let response = ureq::post(&format!("{base}/translate"))
            .timeout(TRANSLATE_TIMEOUT)
            .send_json(serde_json::json!({
                "q": text,
                "source": "auto",
                "target": target_lang,
                "format": "text",
            }))
            .map_err(|e| match e {
                ureq::Error::Transport(t) => TranslateError::ServiceUnavailable {
                    message: t.to_string(),
                },
                other => TranslateError::Request {
                    message: other.to_string(),
                },
            })?;

        let body: serde_json::Value =
            response.into_json().map_err(|e| TranslateError::Request {
                message: format!("malformed translation response: {e}"),
            })?;

        body.get("translatedText")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| TranslateError::Request {
                message: "missing translatedText in response".into(),
            })
    }
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("dictionary_size", &self.to_spanish.len())
            .field("live_service", &self.service_url.is_some())
            .finish()
    }
}
