//! Deterministic hash-based embedder.
//!
//! Buckets xxHash64 token hashes into a fixed-width vector and normalizes.
//! Not semantically meaningful, but deterministic and offline: it lets every
//! pipeline and test run without a model or network. A real provider plugs
//! in by implementing [`Embedder`].

use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use reeldb_core::traits::Embedder;

pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.to_lowercase().split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_for_fixed_input() {
        let e = HashEmbedder::new(32);
        let a = e.embed("a bear in london").await.expect("embed");
        let b = e.embed("a bear in london").await.expect("embed");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[tokio::test]
    async fn overlapping_text_is_closer_than_disjoint() {
        let e = HashEmbedder::new(64);
        let q = e.embed("bear attack forest").await.expect("embed");
        let near = e.embed("a bear attack in the forest").await.expect("embed");
        let far = e.embed("romantic paris dinner").await.expect("embed");
        let sim_near = crate::cosine_similarity(&q, &near).expect("cosine");
        let sim_far = crate::cosine_similarity(&q, &far).expect("cosine");
        assert!(sim_near > sim_far);
    }
}
