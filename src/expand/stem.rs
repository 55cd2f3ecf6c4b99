//! Lightweight suffix-stripping stemmer for English and Spanish tokens.
//!
//! Deliberately shallow: expansion only needs stem *variants* to widen a
//! disjunctive regex filter, so an over-stemmed form costs nothing and an
//! under-stemmed form just misses one variant. Not a linguistic stemmer.

/// Longest-match suffix tables, ordered longest first.
const SUFFIXES_ES: &[&str] = &[
    "amiento", "imiento", "aciones", "adores", "adoras", "amente", "idades",
    "ancia", "encia", "mente", "acion", "ación", "adora", "idad", "ador",
    "ante", "able", "ible", "ista", "ismo", "osa", "oso", "iva", "ivo",
    "es", "as", "os", "ar", "er", "ir", "a", "o", "e",
];

const SUFFIXES_EN: &[&str] = &[
    "ization", "fulness", "ousness", "iveness", "ational", "ement", "ments",
    "ation", "ingly", "ness", "ment", "able", "ible", "edly", "ings",
    "ing", "ies", "ied", "ers", "est", "ed", "er", "ly", "es", "s",
];

/// Minimum stem length left after stripping; shorter stems are noise.
const MIN_STEM_LEN: usize = 3;

/// Strip the longest known suffix for the language, or return the token
/// unchanged when nothing applies.
pub fn stem(token: &str, language: &str) -> String {
    let table = match language {
        "es" | "pt" => SUFFIXES_ES,
        _ => SUFFIXES_EN,
    };

    let lower = token.to_lowercase();
    for suffix in table {
        if let Some(stripped) = lower.strip_suffix(suffix) {
            if stripped.chars().count() >= MIN_STEM_LEN {
                return stripped.to_string();
            }
        }
    }
    lower
}

/// Stemmed variants of the given tokens that differ from the token itself.
pub fn stemmed_variations(tokens: &[&str], language: &str) -> Vec<String> {
    let mut variations = Vec::new();
    for token in tokens {
        let stemmed = stem(token, language);
        if stemmed != token.to_lowercase() && !variations.contains(&stemmed) {
            variations.push(stemmed);
        }
    }
    variations
}
