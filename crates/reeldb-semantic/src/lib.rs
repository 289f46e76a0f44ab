#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunker;
pub mod docs;
pub mod hash_embedder;
pub mod search;

pub use chunker::{chunk_sentences, split_sentences, ChunkingConfig};
pub use docs::DocSemanticSearch;
pub use hash_embedder::HashEmbedder;
pub use search::ChunkSemanticSearch;

/// Cosine similarity over equal-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> anyhow::Result<f32> {
    if a.len() != b.len() {
        anyhow::bail!("vectors must be of the same dimensions");
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        anyhow::bail!("one or both vectors are zero-vectors");
    }
    Ok(dot / (norm_a * norm_b))
}
