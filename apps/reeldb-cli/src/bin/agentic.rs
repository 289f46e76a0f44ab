use std::env;
use std::sync::Arc;
use std::time::Duration;

use reeldb_agent::{
    merge, ActorSearchTool, AgenticConfig, AgenticSearch, GenreSearchTool, HybridSearchTool,
    IntersectionMode, KeywordSearchTool, PatternSearchTool, SearchTool, SemanticSearchTool,
};
use reeldb_core::config::{expand_path, Config};
use reeldb_core::corpus::load_movies;
use reeldb_core::deadline::Deadline;
use reeldb_core::store::FsArtifactStore;
use reeldb_fusion::FusionEngine;
use reeldb_index::InvertedIndex;
use reeldb_semantic::{ChunkSemanticSearch, DocSemanticSearch, HashEmbedder};

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} '<query>' [flags]");
    eprintln!("  --max-iterations N     planning iterations (default 5)");
    eprintln!("  --limit N              final result count (default 5)");
    eprintln!("  --mode auto|strict|loose   intersection mode (default auto)");
    eprintln!("  --merge auto|union|intersect   force a merge strategy (default auto)");
    eprintln!("  --timeout-secs N       abort the search after N seconds");
    std::process::exit(1);
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
    let query = args.remove(0);
    if query.starts_with('-') {
        usage(&program);
    }

    let mut config = AgenticConfig::default();
    let mut forced_merge: Option<String> = None;
    let mut timeout_secs: Option<u64> = None;
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        i += 1;
        let value = args.get(i).cloned();
        match flag {
            "--max-iterations" => {
                config.max_iterations = value
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(|| usage(&program));
            }
            "--limit" => {
                config.final_result_limit = value
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(|| usage(&program));
            }
            "--mode" => {
                config.intersection_mode = match value.as_deref() {
                    Some("auto") => IntersectionMode::Auto,
                    Some("strict") => IntersectionMode::Strict,
                    Some("loose") => IntersectionMode::Loose,
                    _ => usage(&program),
                };
            }
            "--merge" => {
                forced_merge = match value.as_deref() {
                    Some(m @ ("auto" | "union" | "intersect")) => Some(m.to_string()),
                    _ => usage(&program),
                };
            }
            "--timeout-secs" => {
                timeout_secs = Some(
                    value
                        .and_then(|v| v.parse().ok())
                        .unwrap_or_else(|| usage(&program)),
                );
            }
            _ => usage(&program),
        }
        i += 1;
    }

    let app_config = Config::load()?;
    let movies_file =
        expand_path(app_config.get_or("data.movies_file", "data/movies.json".to_string()));
    let cache_dir = expand_path(app_config.get_or("data.cache_dir", "data/cache".to_string()));
    let dim: usize = app_config.get_or("embedding.dim", 256);

    let movies = Arc::new(load_movies(&movies_file)?);
    let store = FsArtifactStore::new(&cache_dir)?;
    let index = Arc::new(InvertedIndex::load_or_build(&store, &movies)?);

    let embedder = Arc::new(HashEmbedder::new(dim));
    let mut chunks = ChunkSemanticSearch::new(Arc::clone(&movies), embedder.clone());
    chunks.load_or_build(&store).await?;
    let chunks = Arc::new(chunks);
    let mut docs = DocSemanticSearch::new(Arc::clone(&movies), embedder);
    docs.load_or_build(&store).await?;
    let docs = Arc::new(docs);
    let fusion = Arc::new(FusionEngine::new(Arc::clone(&index), Arc::clone(&chunks)));

    let tools: Vec<Arc<dyn SearchTool>> = vec![
        Arc::new(KeywordSearchTool::new(Arc::clone(&index))),
        Arc::new(SemanticSearchTool::new(docs)),
        Arc::new(HybridSearchTool::new(fusion)),
        Arc::new(PatternSearchTool::new(Arc::clone(&movies))),
        Arc::new(GenreSearchTool::new(Arc::clone(&movies))),
        Arc::new(ActorSearchTool::new(Arc::clone(&movies), index)),
    ];

    // No completion service is wired here, so planning uses the local
    // heuristic. Wire a CompletionClient to enable LLM planning.
    let search = AgenticSearch::new(tools, None, config);
    let deadline = match timeout_secs {
        Some(secs) => Deadline::after(Duration::from_secs(secs)),
        None => Deadline::none(),
    };

    println!("reeldb agentic search");
    println!("=====================");
    println!("Query: {query}\n");

    let outcome = search.run(&query, &deadline).await;

    let results = match forced_merge.as_deref() {
        Some("union") => {
            let mut merged = merge::merge_union_all(&outcome.history);
            merged.truncate(config.final_result_limit);
            merged
        }
        Some("intersect") => {
            let mut merged = merge::merge_intersection_all(
                &outcome.history,
                config.intersection_mode,
                config.min_intersection_matches,
            );
            merged.truncate(config.final_result_limit);
            merged
        }
        _ => outcome.results.clone(),
    };

    println!("Iterations: {}", outcome.iterations);
    for record in &outcome.history {
        println!(
            "  {} \"{}\" -> {} results  ({})",
            record.tool,
            record.query,
            record.results.len(),
            record.reasoning
        );
    }
    println!("Unique candidates: {}\n", outcome.total_unique_results);

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, movie) in results.iter().enumerate() {
        let tools: Vec<&str> = movie.found_by.iter().map(|t| t.as_str()).collect();
        println!(
            "{:2}. [{:.4}] {} (id {}, matched by {}: {})",
            i + 1,
            movie.score,
            movie.title,
            movie.id,
            movie.matched_by_count,
            tools.join(", ")
        );
        println!("     {}", movie.description);
    }
    Ok(())
}
