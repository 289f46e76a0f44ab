//! Chunked semantic search: one embedding per description window,
//! deduplicated to the best chunk per movie at query time.

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use reeldb_core::error::Error;
use reeldb_core::retry::{retry_with_backoff, RetryPolicy};
use reeldb_core::store::CHUNK_STORE_ARTIFACT;
use reeldb_core::traits::{ArtifactStore, Embedder};
use reeldb_core::types::{Movie, ScoredMovie};

use crate::chunker::{chunk_sentences, ChunkingConfig};
use crate::cosine_similarity;

/// Position of one chunk within its source movie. `movie_idx` refers to the
/// corpus slice order, not the movie id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub movie_idx: usize,
    pub chunk_idx: usize,
    pub total_chunks: usize,
}

#[derive(Serialize, Deserialize)]
struct ChunkBlob {
    dim: usize,
    records: Vec<ChunkRecord>,
    embeddings: Vec<Vec<f32>>,
}

pub struct ChunkSemanticSearch {
    movies: Arc<Vec<Movie>>,
    embedder: Arc<dyn Embedder>,
    config: ChunkingConfig,
    retry: RetryPolicy,
    records: Vec<ChunkRecord>,
    embeddings: Vec<Vec<f32>>,
}

impl ChunkSemanticSearch {
    pub fn new(movies: Arc<Vec<Movie>>, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_config(movies, embedder, ChunkingConfig::default())
    }

    pub fn with_config(
        movies: Arc<Vec<Movie>>,
        embedder: Arc<dyn Embedder>,
        config: ChunkingConfig,
    ) -> Self {
        Self {
            movies,
            embedder,
            config,
            retry: RetryPolicy::default(),
            records: Vec::new(),
            embeddings: Vec::new(),
        }
    }

    pub fn is_built(&self) -> bool {
        !self.embeddings.is_empty()
    }

    /// Chunk every non-empty description and embed each chunk, then persist
    /// vectors and metadata together as one artifact.
    pub async fn build(&mut self, store: &dyn ArtifactStore) -> anyhow::Result<()> {
        if self.movies.is_empty() {
            return Err(Error::EmptyCorpus.into());
        }

        let mut chunks: Vec<String> = Vec::new();
        let mut records: Vec<ChunkRecord> = Vec::new();
        for (movie_idx, movie) in self.movies.iter().enumerate() {
            if movie.description.is_empty() {
                continue;
            }
            let windows = chunk_sentences(&movie.description, self.config);
            let total = windows.len();
            for (chunk_idx, window) in windows.into_iter().enumerate() {
                chunks.push(window);
                records.push(ChunkRecord {
                    movie_idx,
                    chunk_idx,
                    total_chunks: total,
                });
            }
        }

        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(64) {
            let batch_vec = batch.to_vec();
            let embedder = Arc::clone(&self.embedder);
            let vectors = retry_with_backoff(self.retry, || {
                let embedder = Arc::clone(&embedder);
                let batch_vec = batch_vec.clone();
                async move { embedder.embed_batch(&batch_vec).await }
            })
            .await?;
            pb.inc(batch.len() as u64);
            embeddings.extend(vectors);
        }
        pb.finish_and_clear();

        tracing::info!(
            chunks = embeddings.len(),
            movies = self.movies.len(),
            "built chunk embeddings"
        );

        let blob = ChunkBlob {
            dim: self.embedder.dim(),
            records: records.clone(),
            embeddings: embeddings.clone(),
        };
        let bytes = serde_json::to_vec(&blob).map_err(|e| Error::Operation(e.to_string()))?;
        store.put(CHUNK_STORE_ARTIFACT, &bytes)?;

        self.records = records;
        self.embeddings = embeddings;
        Ok(())
    }

    /// Load the persisted chunk store if present, otherwise build it.
    ///
    /// Unlike the lexical index there is no count-mismatch invalidation: the
    /// chunk→movie mapping is recomputed from the stored metadata, so a stale
    /// store is tolerated until the caller forces [`rebuild`](Self::rebuild).
    pub async fn load_or_build(&mut self, store: &dyn ArtifactStore) -> anyhow::Result<()> {
        if !store.exists(CHUNK_STORE_ARTIFACT) {
            return self.build(store).await;
        }
        let bytes = store.get(CHUNK_STORE_ARTIFACT)?;
        let blob: ChunkBlob =
            serde_json::from_slice(&bytes).map_err(|e| Error::CorruptArtifact {
                name: CHUNK_STORE_ARTIFACT.to_string(),
                cause: e.to_string(),
            })?;
        // A parseable but internally inconsistent blob is still corrupt; it
        // must never become a partially populated structure.
        if blob.records.len() != blob.embeddings.len() {
            return Err(Error::CorruptArtifact {
                name: CHUNK_STORE_ARTIFACT.to_string(),
                cause: format!(
                    "{} chunk records but {} embeddings",
                    blob.records.len(),
                    blob.embeddings.len()
                ),
            }
            .into());
        }
        if let Some(bad) = blob.embeddings.iter().position(|v| v.len() != blob.dim) {
            return Err(Error::CorruptArtifact {
                name: CHUNK_STORE_ARTIFACT.to_string(),
                cause: format!(
                    "embedding {bad} has {} dims, expected {}",
                    blob.embeddings[bad].len(),
                    blob.dim
                ),
            }
            .into());
        }
        self.records = blob.records;
        self.embeddings = blob.embeddings;
        Ok(())
    }

    /// Discard any persisted store and rebuild from the live corpus.
    pub async fn rebuild(&mut self, store: &dyn ArtifactStore) -> anyhow::Result<()> {
        self.records.clear();
        self.embeddings.clear();
        self.build(store).await
    }

    /// Embed the query, rank every chunk by cosine similarity, keep the best
    /// chunk per movie and return the top `limit` movies.
    pub async fn search_chunks(
        &self,
        query: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<ScoredMovie>> {
        if !self.is_built() {
            anyhow::bail!("chunk embeddings must be built or loaded before searching");
        }
        let embedder = Arc::clone(&self.embedder);
        let query_owned = query.to_string();
        let query_vec = retry_with_backoff(self.retry, || {
            let embedder = Arc::clone(&embedder);
            let q = query_owned.clone();
            async move { embedder.embed(&q).await }
        })
        .await?;

        let mut scored: Vec<(usize, f32)> = Vec::with_capacity(self.embeddings.len());
        for (i, chunk_vec) in self.embeddings.iter().enumerate() {
            let sim = cosine_similarity(&query_vec, chunk_vec)?;
            scored.push((i, sim));
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit * 2); // oversample, then dedup per movie

        let mut best_per_movie: HashMap<usize, f32> = HashMap::new();
        for &(chunk_i, score) in &scored {
            let movie_idx = self.records[chunk_i].movie_idx;
            let entry = best_per_movie.entry(movie_idx).or_insert(score);
            if score > *entry {
                *entry = score;
            }
        }

        let mut results: Vec<ScoredMovie> = best_per_movie
            .into_iter()
            .filter_map(|(movie_idx, score)| {
                self.movies
                    .get(movie_idx)
                    .map(|m| ScoredMovie::from_movie(m, score))
            })
            .collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        Ok(results)
    }
}
