use std::env;
use std::sync::Arc;

use reeldb_core::config::{expand_path, Config};
use reeldb_core::corpus::load_movies;
use reeldb_core::store::FsArtifactStore;
use reeldb_core::types::ScoredMovie;
use reeldb_fusion::{FusionEngine, DEFAULT_RRF_K};
use reeldb_index::InvertedIndex;
use reeldb_semantic::{ChunkSemanticSearch, HashEmbedder};

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} <mode> <args>");
    eprintln!("Modes:");
    eprintln!("  bm25 <query> [--limit N]           ranked keyword search");
    eprintln!("  any <query> [--limit N]            unranked containment search");
    eprintln!("  weighted <query> [--alpha A] [--limit N]");
    eprintln!("  rrf <query> [--k K] [--limit N]");
    eprintln!("  tf <doc_id> <term>                 term frequency");
    eprintln!("  idf <term>                         inverse document frequency");
    eprintln!("  score <doc_id> <term>              BM25 for one (doc, term)");
    std::process::exit(1);
}

struct Flags {
    query: String,
    limit: usize,
    alpha: f32,
    k: usize,
}

fn parse_flags(args: &[String], program: &str) -> Flags {
    let mut flags = Flags {
        query: String::new(),
        limit: 10,
        alpha: 0.5,
        k: DEFAULT_RRF_K,
    };
    let mut words: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => {
                i += 1;
                flags.limit = args.get(i).and_then(|v| v.parse().ok()).unwrap_or_else(|| usage(program));
            }
            "--alpha" => {
                i += 1;
                flags.alpha = args.get(i).and_then(|v| v.parse().ok()).unwrap_or_else(|| usage(program));
            }
            "--k" => {
                i += 1;
                flags.k = args.get(i).and_then(|v| v.parse().ok()).unwrap_or_else(|| usage(program));
            }
            word => words.push(word),
        }
        i += 1;
    }
    if words.is_empty() {
        usage(program);
    }
    flags.query = words.join(" ");
    flags
}

fn print_results(results: &[ScoredMovie]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    for (i, movie) in results.iter().enumerate() {
        println!("{:2}. [{:.4}] {} (id {})", i + 1, movie.score, movie.title, movie.id);
        println!("     {}", movie.description);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);
    if args.is_empty() {
        usage(&program);
    }
    let mode = args.remove(0);

    let config = Config::load()?;
    let movies_file =
        expand_path(config.get_or("data.movies_file", "data/movies.json".to_string()));
    let cache_dir = expand_path(config.get_or("data.cache_dir", "data/cache".to_string()));
    let dim: usize = config.get_or("embedding.dim", 256);

    let movies = Arc::new(load_movies(&movies_file)?);
    let store = FsArtifactStore::new(&cache_dir)?;
    let index = Arc::new(InvertedIndex::load_or_build(&store, &movies)?);

    match mode.as_str() {
        "tf" | "idf" | "score" => {
            let term = match mode.as_str() {
                "idf" => args.first().unwrap_or_else(|| usage(&program)).clone(),
                _ => args.get(1).unwrap_or_else(|| usage(&program)).clone(),
            };
            match mode.as_str() {
                "idf" => {
                    println!("idf({term}) = {:.6}", index.inverse_document_frequency(&term)?);
                }
                "tf" => {
                    let doc_id: u32 = args
                        .first()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or_else(|| usage(&program));
                    println!("tf({doc_id}, {term}) = {}", index.term_frequency(doc_id, &term)?);
                }
                _ => {
                    let doc_id: u32 = args
                        .first()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or_else(|| usage(&program));
                    println!("bm25({doc_id}, {term}) = {:.6}", index.bm25(doc_id, &term)?);
                }
            }
        }
        "bm25" => {
            let flags = parse_flags(&args, &program);
            print_results(&index.bm25_search(&flags.query, flags.limit));
        }
        "any" => {
            let flags = parse_flags(&args, &program);
            print_results(&index.search(&flags.query, flags.limit));
        }
        "weighted" | "rrf" => {
            let flags = parse_flags(&args, &program);
            let embedder = Arc::new(HashEmbedder::new(dim));
            let mut chunks = ChunkSemanticSearch::new(Arc::clone(&movies), embedder);
            chunks.load_or_build(&store).await?;
            let fusion = FusionEngine::new(index, Arc::new(chunks));
            if mode == "weighted" {
                let hits = fusion.weighted(&flags.query, flags.alpha, flags.limit).await;
                print_results(&hits.into_iter().map(ScoredMovie::from).collect::<Vec<_>>());
            } else {
                let hits = fusion.rrf(&flags.query, flags.k, flags.limit).await;
                for hit in &hits {
                    let lex = hit.bm25_rank.map_or("-".to_string(), |r| r.to_string());
                    let sem = hit.semantic_rank.map_or("-".to_string(), |r| r.to_string());
                    println!(
                        "[{:.4}] {} (id {}, bm25 rank {lex}, semantic rank {sem})",
                        hit.rrf_score, hit.title, hit.id
                    );
                }
            }
        }
        _ => usage(&program),
    }
    Ok(())
}
