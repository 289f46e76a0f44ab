//! LLM-assisted reranking of fused candidate lists.
//!
//! The reranker never grows the candidate list and never fails the search:
//! when every scoring attempt is exhausted the input order comes back
//! unchanged.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use reeldb_core::jsonx::extract_json_object;
use reeldb_core::retry::backoff_delay;
use reeldb_core::traits::{complete_bounded, CompletionClient, PairScorer, COMPLETION_TIMEOUT};
use reeldb_core::types::ScoredMovie;

/// Candidates fetched ahead of reranking: `limit * RERANK_MULTIPLIER`.
pub const RERANK_MULTIPLIER: usize = 5;

const BATCH_SIZE: usize = 10;
const BATCH_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankMethod {
    /// Score candidates ten at a time with a single prompt per batch.
    Batch,
    /// One prompt per candidate.
    Individual,
    /// Delegate to a dedicated pair scorer model.
    CrossEncoder,
}

#[derive(Deserialize)]
struct BatchScores {
    scores: Vec<f32>,
}

#[derive(Deserialize)]
struct SingleScore {
    score: f32,
}

pub struct Reranker {
    completions: Arc<dyn CompletionClient>,
    pair_scorer: Option<Arc<dyn PairScorer>>,
}

impl Reranker {
    pub fn new(
        completions: Arc<dyn CompletionClient>,
        pair_scorer: Option<Arc<dyn PairScorer>>,
    ) -> Self {
        Self {
            completions,
            pair_scorer,
        }
    }

    /// Rerank `candidates` against `query` and return the top `limit`.
    ///
    /// Failures are per-batch (or per-candidate): anything that cannot be
    /// scored keeps 0.0 and the rest still reorder around it.
    pub async fn rerank(
        &self,
        query: &str,
        mut candidates: Vec<ScoredMovie>,
        method: RerankMethod,
        limit: usize,
    ) -> Vec<ScoredMovie> {
        if candidates.is_empty() {
            return candidates;
        }
        let scores = match method {
            RerankMethod::Batch => self.score_batched(query, &candidates).await,
            RerankMethod::Individual => self.score_individually(query, &candidates).await,
            RerankMethod::CrossEncoder => self.score_cross_encoder(query, &candidates).await,
        };
        match scores {
            Some(scores) => {
                for (candidate, score) in candidates.iter_mut().zip(scores) {
                    candidate.score = score;
                }
                candidates.sort_by(|a, b| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
            None => {
                tracing::warn!("reranking produced no scores, keeping fused order");
            }
        }
        candidates.truncate(limit);
        candidates
    }

    async fn score_batched(&self, query: &str, candidates: &[ScoredMovie]) -> Option<Vec<f32>> {
        let mut scores = vec![0.0f32; candidates.len()];
        let mut any_scored = false;
        for (batch_idx, batch) in candidates.chunks(BATCH_SIZE).enumerate() {
            let offset = batch_idx * BATCH_SIZE;
            match self.score_one_batch(query, batch).await {
                Some(batch_scores) => {
                    any_scored = true;
                    for (i, score) in batch_scores.into_iter().take(batch.len()).enumerate() {
                        scores[offset + i] = score;
                    }
                }
                None => {
                    // Skipped batches keep 0.0 so the others still reorder.
                    tracing::warn!(batch = batch_idx, "batch rerank failed, scores stay 0.0");
                }
            }
        }
        any_scored.then_some(scores)
    }

    async fn score_one_batch(&self, query: &str, batch: &[ScoredMovie]) -> Option<Vec<f32>> {
        let mut listing = String::new();
        for (i, candidate) in batch.iter().enumerate() {
            listing.push_str(&format!(
                "{}. {}: {}\n",
                i + 1,
                candidate.title,
                truncate_chars(&candidate.description, 300)
            ));
        }
        let prompt = format!(
            "Rate how relevant each movie is to the query \"{query}\" on a 0.0-1.0 scale.\n\
             Movies:\n{listing}\n\
             Respond with JSON only: {{\"scores\": [s1, s2, ...]}} with exactly {} numbers.",
            batch.len()
        );

        for attempt in 0..BATCH_ATTEMPTS {
            match complete_bounded(self.completions.as_ref(), &prompt, COMPLETION_TIMEOUT).await {
                Ok(text) => {
                    if let Some(parsed) = extract_json_object(&text)
                        .and_then(|v| serde_json::from_value::<BatchScores>(v).ok())
                    {
                        if parsed.scores.len() == batch.len() {
                            return Some(parsed.scores);
                        }
                        tracing::warn!(
                            expected = batch.len(),
                            got = parsed.scores.len(),
                            "batch rerank returned wrong score count"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "batch rerank completion failed");
                }
            }
            if attempt + 1 < BATCH_ATTEMPTS {
                tokio::time::sleep(backoff_delay(attempt as u32, Duration::from_millis(500)))
                    .await;
            }
        }
        None
    }

    async fn score_individually(
        &self,
        query: &str,
        candidates: &[ScoredMovie],
    ) -> Option<Vec<f32>> {
        let mut scores = vec![0.0f32; candidates.len()];
        let mut any_scored = false;
        for (i, candidate) in candidates.iter().enumerate() {
            let prompt = format!(
                "Rate how relevant this movie is to the query \"{query}\" on a 0.0-1.0 scale.\n\
                 Movie: {}: {}\n\
                 Respond with JSON only: {{\"score\": s}}.",
                candidate.title,
                truncate_chars(&candidate.description, 300)
            );
            match complete_bounded(self.completions.as_ref(), &prompt, COMPLETION_TIMEOUT).await {
                Ok(text) => {
                    if let Some(parsed) = extract_json_object(&text)
                        .and_then(|v| serde_json::from_value::<SingleScore>(v).ok())
                    {
                        scores[i] = parsed.score;
                        any_scored = true;
                    }
                }
                Err(e) => {
                    tracing::warn!(candidate = i, error = %e, "individual rerank failed");
                }
            }
        }
        any_scored.then_some(scores)
    }

    async fn score_cross_encoder(
        &self,
        query: &str,
        candidates: &[ScoredMovie],
    ) -> Option<Vec<f32>> {
        let scorer = match &self.pair_scorer {
            Some(scorer) => scorer,
            None => {
                tracing::warn!("cross-encoder rerank requested without a pair scorer");
                return None;
            }
        };
        let texts: Vec<String> = candidates
            .iter()
            .map(|c| format!("{}: {}", c.title, c.description))
            .collect();
        let scored = tokio::time::timeout(COMPLETION_TIMEOUT, scorer.score_pairs(query, &texts));
        match scored.await {
            Ok(Ok(scores)) if scores.len() == candidates.len() => Some(scores),
            Ok(Ok(scores)) => {
                tracing::warn!(
                    expected = candidates.len(),
                    got = scores.len(),
                    "pair scorer returned wrong score count"
                );
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "pair scorer failed");
                None
            }
            Err(_) => {
                tracing::warn!("pair scorer timed out");
                None
            }
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
