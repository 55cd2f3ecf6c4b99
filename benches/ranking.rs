//! Benchmarks for result ranking and the offline inverted index.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ontosearch::corpus::Corpus;
use ontosearch::index::InvertedIndex;
use ontosearch::model::{CorpusEntry, SearchResult, Triple};
use ontosearch::rank::rank_results;

fn synthetic_results(n: usize) -> Vec<SearchResult> {
    (0..n)
        .map(|i| {
            SearchResult::from_triple(Triple::new(
                format!("http://kb/show{i}"),
                "http://kb/genre",
                format!("crime drama number {i}"),
            ))
        })
        .collect()
}

fn synthetic_corpus(n: usize) -> Arc<Corpus> {
    let entries = (0..n)
        .map(|i| CorpusEntry {
            uri: format!("u{i}"),
            label: format!("Show Number {i}"),
            r#abstract: format!("a series about topic {i} and crime"),
            genre: "Drama".into(),
            ..Default::default()
        })
        .collect();
    Arc::new(Corpus::from_entries("en", entries))
}

fn bench_rank(c: &mut Criterion) {
    let results = synthetic_results(500);

    c.bench_function("rank_500_results", |bench| {
        bench.iter(|| black_box(rank_results(results.clone(), "crime", 500)))
    });
}

fn bench_index_search(c: &mut Criterion) {
    let index = InvertedIndex::build(synthetic_corpus(10_000));

    c.bench_function("inverted_index_10k_token_hit", |bench| {
        bench.iter(|| black_box(index.search("number", "en")))
    });

    c.bench_function("inverted_index_10k_linear_fallback", |bench| {
        // No label token matches "crime"; forces the linear-scan path.
        bench.iter(|| black_box(index.search("crime", "en")))
    });
}

criterion_group!(benches, bench_rank, bench_index_search);
criterion_main!(benches);
