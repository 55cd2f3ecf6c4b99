//! ontosearch CLI: resilient multi-source semantic search over RDF triples.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use ontosearch::config::EngineConfig;
use ontosearch::search::{SearchEngine, SearchOptions};

#[derive(Parser)]
#[command(name = "ontosearch", version, about = "Resilient multi-source semantic search")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true, default_value = "ontosearch.toml")]
    config: PathBuf,

    /// Data directory override for cache and embedded store.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Multi-strategy semantic search.
    Search {
        /// Free-text query.
        query: String,

        /// Restrict matches to one language (e.g. "en", "es").
        #[arg(long)]
        lang: Option<String>,

        /// Disable query expansion.
        #[arg(long)]
        no_expansion: bool,

        /// Disable vector-similarity search.
        #[arg(long)]
        no_embeddings: bool,

        /// Disable translated query variants.
        #[arg(long)]
        no_translation: bool,
    },

    /// Structural search with exact subject/predicate/object bindings.
    Pattern {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        predicate: Option<String>,
        #[arg(long)]
        object: Option<String>,
        #[arg(long)]
        lang: Option<String>,
    },

    /// Fuzzy search at a similarity threshold.
    Fuzzy {
        term: String,

        /// Minimum character-overlap similarity.
        #[arg(long, default_value = "0.7")]
        threshold: f64,

        #[arg(long)]
        lang: Option<String>,
    },

    /// Resolve an external lookup through live → cache → offline tiers.
    Resolve {
        query: String,

        #[arg(long)]
        lang: Option<String>,
    },

    /// Re-verify a cache entry against a fresh live fetch.
    Verify {
        /// Cache key, e.g. "heist_es".
        key: String,
    },

    /// Show cache, corpus, translation, and vector statistics.
    Stats,

    /// Insert one triple into the knowledge base.
    Insert {
        subject: String,
        predicate: String,
        object: String,
    },

    /// Rebuild the vector index from all stored triples.
    IndexVectors,

    /// Translate text via dictionary, cache, or live service.
    Translate {
        text: String,

        /// Target language.
        #[arg(long, default_value = "es")]
        target: String,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::load_or_default(&cli.config).into_diagnostic()?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let engine = SearchEngine::from_config(&config)?;

    match cli.command {
        Commands::Search {
            query,
            lang,
            no_expansion,
            no_embeddings,
            no_translation,
        } => {
            let options = SearchOptions {
                language: lang,
                use_query_expansion: !no_expansion,
                use_embeddings: !no_embeddings,
                use_translation: !no_translation,
                fuzzy_threshold: None,
            };
            let results = engine.search(&query, &options)?;
            print_results(&results);
        }

        Commands::Pattern {
            subject,
            predicate,
            object,
            lang,
        } => {
            let results = engine.search_by_pattern(
                subject.as_deref(),
                predicate.as_deref(),
                object.as_deref(),
                lang.as_deref(),
            )?;
            print_results(&results);
        }

        Commands::Fuzzy {
            term,
            threshold,
            lang,
        } => {
            let results = engine.fuzzy_search(&term, Some(threshold), lang.as_deref())?;
            print_results(&results);
        }

        Commands::Resolve { query, lang } => {
            let resolved = engine.resolve_with_fallback(&query, lang.as_deref())?;
            println!(
                "source={} verified={} results={}",
                resolved.source,
                resolved.verified,
                resolved.payload.len()
            );
            for resource in &resolved.payload {
                println!("  {} \"{}\"", resource.uri, resource.label);
            }
        }

        Commands::Verify { key } => {
            let consistent = engine.verify(&key)?;
            if consistent {
                println!("\"{key}\" verified: fresh data is consistent with the cache");
            } else {
                println!("\"{key}\" not verified: stale payload kept");
            }
        }

        Commands::Stats => {
            let stats = engine.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats).into_diagnostic()?);
        }

        Commands::Insert {
            subject,
            predicate,
            object,
        } => {
            engine.insert_triple(&subject, &predicate, &object)?;
            println!("Inserted <{subject}> <{predicate}> \"{object}\"");
        }

        Commands::IndexVectors => {
            let indexed = engine.index_vectors()?;
            println!("Indexed {indexed} triples into the vector index");
        }

        Commands::Translate { text, target } => {
            let translation = engine.translator().translate(&text, &target);
            println!(
                "\"{}\" -> \"{}\" ({:?})",
                translation.original, translation.translated, translation.source
            );
        }
    }

    Ok(())
}

fn print_results(results: &[ontosearch::model::SearchResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    println!("Results ({}):", results.len());
    for (i, result) in results.iter().enumerate() {
        let score = result
            .score
            .map(|s| format!("{s:.4}"))
            .unwrap_or_else(|| "-".into());
        println!(
            "  {}. [{}] {} | {} | {}",
            i + 1,
            score,
            result.triple.subject,
            result.triple.predicate,
            result.triple.object
        );
    }
}
