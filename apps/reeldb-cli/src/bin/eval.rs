use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use reeldb_core::config::{expand_path, Config};
use reeldb_core::corpus::load_movies;
use reeldb_core::eval::{load_judgments, precision_at_k, reciprocal_rank};
use reeldb_core::store::FsArtifactStore;
use reeldb_core::types::ScoredMovie;
use reeldb_fusion::{FusionEngine, DEFAULT_RRF_K};
use reeldb_index::InvertedIndex;
use reeldb_semantic::{ChunkSemanticSearch, HashEmbedder};

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} <judgments.json> [flags]");
    eprintln!("  --mode bm25|weighted|rrf   search mode to score (default bm25)");
    eprintln!("  --k N                      cutoff for precision@k (default 5)");
    eprintln!("  --alpha A                  weighted fusion alpha (default 0.5)");
    std::process::exit(1);
}

struct Flags {
    judgments_file: PathBuf,
    mode: String,
    k: usize,
    alpha: f32,
}

fn parse_flags(args: &[String], program: &str) -> Flags {
    let mut flags = Flags {
        judgments_file: PathBuf::new(),
        mode: "bm25".to_string(),
        k: 5,
        alpha: 0.5,
    };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--mode" => {
                i += 1;
                flags.mode = args.get(i).cloned().unwrap_or_else(|| usage(program));
            }
            "--k" => {
                i += 1;
                flags.k = args.get(i).and_then(|v| v.parse().ok()).unwrap_or_else(|| usage(program));
            }
            "--alpha" => {
                i += 1;
                flags.alpha = args.get(i).and_then(|v| v.parse().ok()).unwrap_or_else(|| usage(program));
            }
            path if flags.judgments_file.as_os_str().is_empty() => {
                flags.judgments_file = PathBuf::from(path);
            }
            _ => usage(program),
        }
        i += 1;
    }
    if flags.judgments_file.as_os_str().is_empty() || flags.k == 0 {
        usage(program);
    }
    match flags.mode.as_str() {
        "bm25" | "weighted" | "rrf" => {}
        _ => usage(program),
    }
    flags
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
    let flags = parse_flags(&args, &program);

    let config = Config::load()?;
    let movies_file =
        expand_path(config.get_or("data.movies_file", "data/movies.json".to_string()));
    let cache_dir = expand_path(config.get_or("data.cache_dir", "data/cache".to_string()));
    let dim: usize = config.get_or("embedding.dim", 256);

    let judgments = load_judgments(&flags.judgments_file)?;
    let movies = Arc::new(load_movies(&movies_file)?);
    let store = FsArtifactStore::new(&cache_dir)?;
    let index = Arc::new(InvertedIndex::load_or_build(&store, &movies)?);

    let fusion = if flags.mode == "bm25" {
        None
    } else {
        let embedder = Arc::new(HashEmbedder::new(dim));
        let mut chunks = ChunkSemanticSearch::new(Arc::clone(&movies), embedder);
        chunks.load_or_build(&store).await?;
        Some(FusionEngine::new(Arc::clone(&index), Arc::new(chunks)))
    };

    println!("Scoring {} queries, {} @ {}", judgments.len(), flags.mode, flags.k);
    println!();

    let mut precision_sum = 0.0f32;
    let mut rr_sum = 0.0f32;
    for judgment in &judgments {
        let results: Vec<ScoredMovie> = match (&fusion, flags.mode.as_str()) {
            (None, _) => index.bm25_search(&judgment.query, flags.k),
            (Some(engine), "weighted") => engine
                .weighted(&judgment.query, flags.alpha, flags.k)
                .await
                .into_iter()
                .map(ScoredMovie::from)
                .collect(),
            (Some(engine), _) => engine
                .rrf(&judgment.query, DEFAULT_RRF_K, flags.k)
                .await
                .into_iter()
                .map(ScoredMovie::from)
                .collect(),
        };
        let precision = precision_at_k(&results, &judgment.relevant, flags.k);
        let rr = reciprocal_rank(&results, &judgment.relevant);
        precision_sum += precision;
        rr_sum += rr;
        println!(
            "  p@{}={:.3} rr={:.3}  \"{}\" ({} relevant, {} returned)",
            flags.k,
            precision,
            rr,
            judgment.query,
            judgment.relevant.len(),
            results.len()
        );
    }

    let n = judgments.len() as f32;
    println!();
    println!("mean p@{} = {:.3}", flags.k, precision_sum / n);
    println!("mean rr   = {:.3}", rr_sum / n);
    Ok(())
}
