use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use reeldb_core::config::{expand_path, Config};
use reeldb_core::corpus::load_movies;
use reeldb_core::store::FsArtifactStore;
use reeldb_index::InvertedIndex;
use reeldb_semantic::{ChunkSemanticSearch, DocSemanticSearch, HashEmbedder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let mut skip_embeddings = false;
    let mut movies_file: Option<PathBuf> = None;
    for arg in &args {
        match arg.as_str() {
            "--skip-embeddings" | "-s" => skip_embeddings = true,
            _ if !arg.starts_with('-') => movies_file = Some(PathBuf::from(arg)),
            other => {
                eprintln!("Unknown flag: {other}");
                std::process::exit(1);
            }
        }
    }
    let movies_file = movies_file.unwrap_or_else(|| {
        expand_path(config.get_or("data.movies_file", "data/movies.json".to_string()))
    });
    let cache_dir = expand_path(config.get_or("data.cache_dir", "data/cache".to_string()));
    let dim: usize = config.get_or("embedding.dim", 256);

    println!("reeldb indexer");
    println!("==============");
    println!("Catalog:   {}", movies_file.display());
    println!("Cache dir: {}", cache_dir.display());

    fs::create_dir_all(&cache_dir)?;
    let store = FsArtifactStore::new(&cache_dir)?;

    let movies = Arc::new(load_movies(&movies_file)?);
    println!("Loaded {} movies", movies.len());

    let mut index = InvertedIndex::new();
    index.build(&movies)?;
    index.save(&store)?;
    println!("Built inverted index ({} documents)", movies.len());

    if skip_embeddings {
        println!("Skipping embeddings (--skip-embeddings)");
    } else {
        let embedder = Arc::new(HashEmbedder::new(dim));
        let mut chunks = ChunkSemanticSearch::new(Arc::clone(&movies), embedder.clone());
        chunks.build(&store).await?;
        println!("Built chunk embeddings");

        let mut docs = DocSemanticSearch::new(Arc::clone(&movies), embedder);
        docs.build(&store).await?;
        println!("Built document embeddings");
    }

    println!("\nDone. Try: cargo run --bin reeldb-search bm25 'a bear in london'");
    Ok(())
}
