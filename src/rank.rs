//! Relevance scoring and ranking of merged search results.
//!
//! BM25 over the concatenated triple text, boosted by match type
//! (exact/partial/fuzzy) and match position (subject/predicate/object),
//! then normalized so the top result scores exactly 1.0.

use crate::model::SearchResult;

/// BM25 term-frequency saturation parameter.
const K1: f64 = 1.5;
/// BM25 length-normalization parameter.
const B: f64 = 0.75;

/// Which field of the triple first contained the search term
/// (priority order: subject, then predicate, then object).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPosition {
    Subject,
    Predicate,
    Object,
}

impl MatchPosition {
    /// Boost applied for where the term matched.
    pub fn boost(self) -> f64 {
        match self {
            MatchPosition::Subject => 1.5,
            MatchPosition::Predicate => 1.2,
            MatchPosition::Object => 1.0,
        }
    }
}

/// How closely the result matched the search term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    /// Some field equals the term.
    Exact,
    /// Some field contains the term.
    Partial,
    /// Neither; the result arrived via a fuzzy/vector strategy.
    Fuzzy,
}

impl MatchType {
    pub fn boost(self) -> f64 {
        match self {
            MatchType::Exact => 2.0,
            MatchType::Partial => 1.0,
            MatchType::Fuzzy => 0.5,
        }
    }
}

/// Per-result match statistics feeding the final score.
#[derive(Debug, Clone)]
pub struct ScoringFactors {
    pub match_type: MatchType,
    pub match_position: MatchPosition,
    pub term_frequency: usize,
    pub document_frequency: usize,
    pub result_length: usize,
}

/// TF-IDF score: ln(1 + tf) · ln(N / df). Kept for diagnostics and
/// comparison; ranking uses BM25.
pub fn tf_idf(term_frequency: usize, document_frequency: usize, total_documents: usize) -> f64 {
    if document_frequency == 0 {
        return 0.0;
    }
    let tf = (1.0 + term_frequency as f64).ln();
    let idf = (total_documents as f64 / document_frequency as f64).ln();
    tf * idf
}

/// BM25 score with idf = ln((N − df + 0.5) / (df + 0.5)).
pub fn bm25(
    term_frequency: usize,
    document_length: usize,
    average_document_length: f64,
    document_frequency: usize,
    total_documents: usize,
) -> f64 {
    let tf = term_frequency as f64;
    let df = document_frequency as f64;
    let n = total_documents as f64;

    let idf = ((n - df + 0.5) / (df + 0.5)).ln();
    let avg = if average_document_length > 0.0 {
        average_document_length
    } else {
        1.0
    };

    let numerator = tf * (K1 + 1.0);
    let denominator = tf + K1 * (1.0 - B + B * (document_length as f64 / avg));

    idf * (numerator / denominator)
}

/// Final score for one result: BM25 × match-type boost × position boost.
pub fn final_score(
    factors: &ScoringFactors,
    total_documents: usize,
    average_document_length: f64,
) -> f64 {
    let base = bm25(
        factors.term_frequency,
        factors.result_length,
        average_document_length,
        factors.document_frequency,
        total_documents,
    );
    base * factors.match_type.boost() * factors.match_position.boost()
}

/// Derive match statistics for a result within the merged set.
pub fn extract_factors(
    result: &SearchResult,
    term_lower: &str,
    all_results: &[SearchResult],
) -> ScoringFactors {
    let triple = &result.triple;
    let subject = triple.subject.to_lowercase();
    let predicate = triple.predicate.to_lowercase();
    let object = triple.object.to_lowercase();

    let match_position = if subject.contains(term_lower) {
        MatchPosition::Subject
    } else if predicate.contains(term_lower) {
        MatchPosition::Predicate
    } else {
        MatchPosition::Object
    };

    let match_type = if [&subject, &predicate, &object].iter().any(|v| *v == term_lower) {
        MatchType::Exact
    } else if [&subject, &predicate, &object]
        .iter()
        .any(|v| v.contains(term_lower))
    {
        MatchType::Partial
    } else {
        MatchType::Fuzzy
    };

    let text = triple.combined_text();
    let term_frequency = count_occurrences(&text, term_lower);

    let document_frequency = all_results
        .iter()
        .filter(|r| r.triple.combined_text().contains(term_lower))
        .count();

    ScoringFactors {
        match_type,
        match_position,
        term_frequency,
        document_frequency,
        result_length: triple.text_len(),
    }
}

/// Non-overlapping occurrences of `needle` in `haystack`.
fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Divide every score by the maximum observed score so the top result scores
/// exactly 1.0. An all-zero list is left unchanged.
pub fn normalize_scores(results: &mut [SearchResult]) {
    let max = results
        .iter()
        .filter_map(|r| r.score)
        .fold(0.0_f64, f64::max);
    if max == 0.0 {
        return;
    }
    for result in results {
        result.score = Some(result.score.unwrap_or(0.0) / max);
    }
}

/// Score, normalize, and sort the merged result set against the search term.
///
/// The sort is stable and descending by score, so ties preserve merge order.
pub fn rank_results(
    mut results: Vec<SearchResult>,
    search_term: &str,
    total_documents: usize,
) -> Vec<SearchResult> {
    if results.is_empty() {
        return results;
    }

    let term_lower = search_term.to_lowercase();
    let average_length = results
        .iter()
        .map(|r| r.triple.text_len())
        .sum::<usize>() as f64
        / results.len() as f64;

    let snapshot = results.clone();
    for result in &mut results {
        let factors = extract_factors(result, &term_lower, &snapshot);
        result.score = Some(final_score(&factors, total_documents, average_length));
    }

    normalize_scores(&mut results);
    results.sort_by(|a, b| {
        b.score
            .unwrap_or(0.0)
            .partial_cmp(&a.score.unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Triple;

    fn result(s: &str, p: &str, o: &str) -> SearchResult {
        SearchResult::from_triple(Triple::new(s, p, o))
    }

    #[test]
    fn bm25_non_decreasing_in_term_frequency() {
        let mut prev = f64::NEG_INFINITY;
        for tf in 1..20 {
            let score = bm25(tf, 100, 100.0, 2, 50);
            assert!(score >= prev, "tf={tf}: {score} < {prev}");
            prev = score;
        }
    }

    #[test]
    fn bm25_non_increasing_in_document_frequency() {
        let mut prev = f64::INFINITY;
        for df in 1..20 {
            let score = bm25(3, 100, 100.0, df, 50);
            assert!(score <= prev, "df={df}: {score} > {prev}");
            prev = score;
        }
    }

    #[test]
    fn normalize_top_score_is_one() {
        let mut results = vec![result("a", "b", "c"), result("d", "e", "f")];
        results[0].score = Some(4.2);
        results[1].score = Some(2.1);
        normalize_scores(&mut results);
        assert_eq!(results[0].score, Some(1.0));
        assert_eq!(results[1].score, Some(0.5));
    }

    #[test]
    fn normalize_leaves_all_zero_unchanged() {
        let mut results = vec![result("a", "b", "c")];
        results[0].score = Some(0.0);
        normalize_scores(&mut results);
        assert_eq!(results[0].score, Some(0.0));
    }

    #[test]
    fn exact_match_outranks_partial() {
        let results = vec![
            result("http://kb/other", "rdfs:label", "a breaking story"),
            result("breaking", "rdfs:label", "something"),
        ];
        let ranked = rank_results(results, "breaking", 10);
        assert_eq!(ranked[0].triple.subject, "breaking");
        assert_eq!(ranked[0].score, Some(1.0));
    }

    #[test]
    fn subject_position_outranks_object() {
        // Same text lengths and match types, different positions.
        let results = vec![
            result("xxxx", "p", "heist"),
            result("heist", "p", "xxxx"),
        ];
        let ranked = rank_results(results, "heist", 10);
        assert_eq!(ranked[0].triple.subject, "heist");
    }

    #[test]
    fn match_type_boosts() {
        assert_eq!(MatchType::Exact.boost(), 2.0);
        assert_eq!(MatchType::Partial.boost(), 1.0);
        assert_eq!(MatchType::Fuzzy.boost(), 0.5);
    }

    #[test]
    fn position_boosts() {
        assert_eq!(MatchPosition::Subject.boost(), 1.5);
        assert_eq!(MatchPosition::Predicate.boost(), 1.2);
        assert_eq!(MatchPosition::Object.boost(), 1.0);
    }

    #[test]
    fn tf_idf_zero_document_frequency() {
        assert_eq!(tf_idf(5, 0, 100), 0.0);
    }

    #[test]
    fn factors_detect_position_priority() {
        let r = result("heist subject", "heist predicate", "heist object");
        let factors = extract_factors(&r, "heist", std::slice::from_ref(&r));
        assert_eq!(factors.match_position, MatchPosition::Subject);
        assert_eq!(factors.term_frequency, 3);
        assert_eq!(factors.document_frequency, 1);
    }
}
