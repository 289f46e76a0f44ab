//! Whole-document semantic search: one embedding per movie over
//! title + description. Unlike the chunk store, this cache is invalidated
//! when the corpus count changes, since vectors map to movies by position.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use reeldb_core::error::Error;
use reeldb_core::retry::{retry_with_backoff, RetryPolicy};
use reeldb_core::store::DOC_EMBEDDINGS_ARTIFACT;
use reeldb_core::traits::{ArtifactStore, Embedder};
use reeldb_core::types::{Movie, ScoredMovie};

use crate::cosine_similarity;

#[derive(Serialize, Deserialize)]
struct DocBlob {
    dim: usize,
    embeddings: Vec<Vec<f32>>,
}

pub struct DocSemanticSearch {
    movies: Arc<Vec<Movie>>,
    embedder: Arc<dyn Embedder>,
    retry: RetryPolicy,
    embeddings: Vec<Vec<f32>>,
}

impl DocSemanticSearch {
    pub fn new(movies: Arc<Vec<Movie>>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            movies,
            embedder,
            retry: RetryPolicy::default(),
            embeddings: Vec::new(),
        }
    }

    pub fn is_built(&self) -> bool {
        !self.embeddings.is_empty()
    }

    pub async fn build(&mut self, store: &dyn ArtifactStore) -> anyhow::Result<()> {
        if self.movies.is_empty() {
            return Err(Error::EmptyCorpus.into());
        }
        let texts: Vec<String> = self.movies.iter().map(Movie::search_text).collect();
        let embedder = Arc::clone(&self.embedder);
        let embeddings = retry_with_backoff(self.retry, || {
            let embedder = Arc::clone(&embedder);
            let texts = texts.clone();
            async move { embedder.embed_batch(&texts).await }
        })
        .await?;

        let blob = DocBlob {
            dim: self.embedder.dim(),
            embeddings: embeddings.clone(),
        };
        let bytes = serde_json::to_vec(&blob).map_err(|e| Error::Operation(e.to_string()))?;
        store.put(DOC_EMBEDDINGS_ARTIFACT, &bytes)?;
        self.embeddings = embeddings;
        Ok(())
    }

    pub async fn load_or_build(&mut self, store: &dyn ArtifactStore) -> anyhow::Result<()> {
        if store.exists(DOC_EMBEDDINGS_ARTIFACT) {
            let bytes = store.get(DOC_EMBEDDINGS_ARTIFACT)?;
            let blob: DocBlob =
                serde_json::from_slice(&bytes).map_err(|e| Error::CorruptArtifact {
                    name: DOC_EMBEDDINGS_ARTIFACT.to_string(),
                    cause: e.to_string(),
                })?;
            if blob.embeddings.len() == self.movies.len() {
                self.embeddings = blob.embeddings;
                return Ok(());
            }
            tracing::info!(
                persisted = blob.embeddings.len(),
                live = self.movies.len(),
                "document count changed, rebuilding embeddings"
            );
        }
        self.build(store).await
    }

    pub async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<ScoredMovie>> {
        if !self.is_built() {
            anyhow::bail!("document embeddings must be built or loaded before searching");
        }
        let embedder = Arc::clone(&self.embedder);
        let query_owned = query.to_string();
        let query_vec = retry_with_backoff(self.retry, || {
            let embedder = Arc::clone(&embedder);
            let q = query_owned.clone();
            async move { embedder.embed(&q).await }
        })
        .await?;

        let mut scored: Vec<ScoredMovie> = Vec::with_capacity(self.movies.len());
        for (movie, vec) in self.movies.iter().zip(self.embeddings.iter()) {
            let sim = cosine_similarity(&query_vec, vec)?;
            scored.push(ScoredMovie::from_movie(movie, sim));
        }
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }
}
