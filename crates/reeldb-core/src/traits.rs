//! Collaborator seams. The engines never talk to a model, an LLM service
//! or the filesystem directly; they receive these at construction.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Turns text into a fixed-width vector. Must be deterministic for a fixed
/// model version; the core only ever computes cosine similarity over the
/// returned vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Free-text completion service used for query rewriting, tool planning,
/// reranking and answer generation.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Upper bound on any single completion round trip.
pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// Issue one completion bounded by `timeout`. Expiry comes back as an
/// ordinary error for the caller to downgrade to its fallback, so a hung
/// service can never stall a search indefinitely.
pub async fn complete_bounded(
    client: &dyn CompletionClient,
    prompt: &str,
    timeout: Duration,
) -> anyhow::Result<String> {
    match tokio::time::timeout(timeout, client.complete(prompt)).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("completion timed out after {timeout:?}")),
    }
}

/// Cross-encoder style relevance judge: scores (query, text) pairs.
#[async_trait]
pub trait PairScorer: Send + Sync {
    async fn score_pairs(&self, query: &str, texts: &[String]) -> anyhow::Result<Vec<f32>>;
}

/// Opaque blob persistence keyed by artifact name. The engines require only
/// get/put/exists semantics, not a specific on-disk format.
pub trait ArtifactStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Vec<u8>>;
    fn put(&self, name: &str, bytes: &[u8]) -> Result<()>;
    fn exists(&self, name: &str) -> bool;
}
