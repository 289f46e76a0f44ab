//! Rank fusion over the lexical and semantic result lists.
//!
//! Both legs are fetched with a heavily inflated limit so the lists overlap
//! before truncation; they run concurrently since each reads only its own
//! already-built, read-only structures.

use std::collections::HashMap;
use std::sync::Arc;

use reeldb_core::types::{MovieId, ScoredMovie};
use reeldb_index::InvertedIndex;
use reeldb_semantic::ChunkSemanticSearch;

use crate::rerank::{RerankMethod, Reranker, RERANK_MULTIPLIER};
use crate::{normalize, rrf_score};

/// Each leg fetches `limit * OVERSAMPLE_FACTOR` before fusion.
pub const OVERSAMPLE_FACTOR: usize = 500;
pub const DEFAULT_RRF_K: usize = 60;

/// One fused result with both leg scores kept for diagnostics.
#[derive(Debug, Clone)]
pub struct WeightedHit {
    pub id: MovieId,
    pub title: String,
    pub description: String,
    pub bm25_score: f32,
    pub semantic_score: f32,
    pub hybrid_score: f32,
}

/// One RRF result with the per-list ranks (`None` = not found in that list).
#[derive(Debug, Clone)]
pub struct RrfHit {
    pub id: MovieId,
    pub title: String,
    pub description: String,
    pub rrf_score: f32,
    pub bm25_rank: Option<usize>,
    pub semantic_rank: Option<usize>,
}

impl From<WeightedHit> for ScoredMovie {
    fn from(hit: WeightedHit) -> Self {
        ScoredMovie {
            id: hit.id,
            title: hit.title,
            description: hit.description,
            score: hit.hybrid_score,
        }
    }
}

impl From<RrfHit> for ScoredMovie {
    fn from(hit: RrfHit) -> Self {
        ScoredMovie {
            id: hit.id,
            title: hit.title,
            description: hit.description,
            score: hit.rrf_score,
        }
    }
}

pub struct FusionEngine {
    index: Arc<InvertedIndex>,
    chunks: Arc<ChunkSemanticSearch>,
}

impl FusionEngine {
    pub fn new(index: Arc<InvertedIndex>, chunks: Arc<ChunkSemanticSearch>) -> Self {
        Self { index, chunks }
    }

    async fn both_legs(
        &self,
        query: &str,
        fetch: usize,
    ) -> (Vec<ScoredMovie>, Vec<ScoredMovie>) {
        let (lexical, semantic) = tokio::join!(
            async { self.index.bm25_search(query, fetch) },
            self.chunks.search_chunks(query, fetch),
        );
        // A failed semantic leg degrades to lexical-only fusion.
        let semantic = semantic.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "semantic leg failed, fusing lexical only");
            Vec::new()
        });
        (lexical, semantic)
    }

    /// Min-max normalize each leg independently, then combine as
    /// `alpha * lexical + (1 - alpha) * semantic`; a document missing from
    /// one leg contributes 0.0 on that side.
    pub async fn weighted(&self, query: &str, alpha: f32, limit: usize) -> Vec<WeightedHit> {
        let (lexical, semantic) = self.both_legs(query, limit * OVERSAMPLE_FACTOR).await;

        let norm_lex = normalize(&lexical.iter().map(|r| r.score).collect::<Vec<_>>());
        let norm_sem = normalize(&semantic.iter().map(|r| r.score).collect::<Vec<_>>());

        let mut combined: HashMap<MovieId, WeightedHit> = HashMap::new();
        for (res, &score) in lexical.iter().zip(norm_lex.iter()) {
            combined.insert(
                res.id,
                WeightedHit {
                    id: res.id,
                    title: res.title.clone(),
                    description: res.description.clone(),
                    bm25_score: score,
                    semantic_score: 0.0,
                    hybrid_score: 0.0,
                },
            );
        }
        for (res, &score) in semantic.iter().zip(norm_sem.iter()) {
            combined
                .entry(res.id)
                .and_modify(|hit| hit.semantic_score = score)
                .or_insert_with(|| WeightedHit {
                    id: res.id,
                    title: res.title.clone(),
                    description: res.description.clone(),
                    bm25_score: 0.0,
                    semantic_score: score,
                    hybrid_score: 0.0,
                });
        }

        let mut hits: Vec<WeightedHit> = combined
            .into_values()
            .map(|mut hit| {
                hit.hybrid_score = alpha * hit.bm25_score + (1.0 - alpha) * hit.semantic_score;
                hit
            })
            .collect();
        hits.sort_by(|a, b| {
            b.hybrid_score
                .partial_cmp(&a.hybrid_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        hits
    }

    /// Reciprocal-rank fusion: each document earns `1/(k + rank)` per list
    /// it appears in (1-indexed), summed across lists.
    pub async fn rrf(&self, query: &str, k: usize, limit: usize) -> Vec<RrfHit> {
        let (lexical, semantic) = self.both_legs(query, limit * OVERSAMPLE_FACTOR).await;

        let mut combined: HashMap<MovieId, RrfHit> = HashMap::new();
        for (rank0, res) in lexical.iter().enumerate() {
            let rank = rank0 + 1;
            combined.insert(
                res.id,
                RrfHit {
                    id: res.id,
                    title: res.title.clone(),
                    description: res.description.clone(),
                    rrf_score: rrf_score(rank, k),
                    bm25_rank: Some(rank),
                    semantic_rank: None,
                },
            );
        }
        for (rank0, res) in semantic.iter().enumerate() {
            let rank = rank0 + 1;
            combined
                .entry(res.id)
                .and_modify(|hit| {
                    hit.rrf_score += rrf_score(rank, k);
                    hit.semantic_rank = Some(rank);
                })
                .or_insert_with(|| RrfHit {
                    id: res.id,
                    title: res.title.clone(),
                    description: res.description.clone(),
                    rrf_score: rrf_score(rank, k),
                    bm25_rank: None,
                    semantic_rank: Some(rank),
                });
        }

        let mut hits: Vec<RrfHit> = combined.into_values().collect();
        hits.sort_by(|a, b| {
            b.rrf_score
                .partial_cmp(&a.rrf_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        hits
    }

    /// Weighted fusion followed by a rerank pass: the fused list is fetched
    /// `RERANK_MULTIPLIER` deep so the reranker has room to promote, then
    /// cut back to `limit`.
    pub async fn weighted_reranked(
        &self,
        query: &str,
        alpha: f32,
        limit: usize,
        reranker: &Reranker,
        method: RerankMethod,
    ) -> Vec<ScoredMovie> {
        let hits = self.weighted(query, alpha, limit * RERANK_MULTIPLIER).await;
        let candidates: Vec<ScoredMovie> = hits.into_iter().map(ScoredMovie::from).collect();
        reranker.rerank(query, candidates, method, limit).await
    }
}
