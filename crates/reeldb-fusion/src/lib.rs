#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod fuse;
pub mod rerank;

pub use fuse::{FusionEngine, RrfHit, WeightedHit, DEFAULT_RRF_K, OVERSAMPLE_FACTOR};
pub use rerank::{RerankMethod, Reranker, RERANK_MULTIPLIER};

/// Min-max normalize scores to [0, 1]. A flat list (max == min, including
/// the empty and single-element cases) maps every score to 1.0: equally
/// scored results are all equally relevant, not all irrelevant.
pub fn normalize(scores: &[f32]) -> Vec<f32> {
    let Some(min) = scores.iter().copied().reduce(f32::min) else {
        return Vec::new();
    };
    let max = scores.iter().copied().fold(min, f32::max);
    if max > min {
        scores.iter().map(|s| (s - min) / (max - min)).collect()
    } else {
        vec![1.0; scores.len()]
    }
}

/// Reciprocal-rank contribution for a 1-indexed rank.
pub fn rrf_score(rank: usize, k: usize) -> f32 {
    1.0 / (k + rank) as f32
}
