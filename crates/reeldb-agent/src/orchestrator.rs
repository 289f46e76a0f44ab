//! The agentic control loop: plan, execute, pool, repeat, then merge and
//! optionally rerank. No step may abort the search; everything external
//! degrades to a documented fallback and the loop only ends through its
//! termination conditions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;

use reeldb_core::deadline::Deadline;
use reeldb_core::jsonx::extract_json_object;
use reeldb_core::traits::{complete_bounded, CompletionClient, COMPLETION_TIMEOUT};
use reeldb_core::types::{MovieId, ScoredMovie};

use crate::merge::{merge_auto, IntersectionMode, MergedMovie};
use crate::planner::{PlanDecision, Planner};
use crate::tools::{SearchTool, ToolKind};

#[derive(Debug, Clone, Copy)]
pub struct AgenticConfig {
    pub max_iterations: usize,
    pub max_results_per_tool: usize,
    pub final_result_limit: usize,
    pub min_intersection_matches: usize,
    pub intersection_mode: IntersectionMode,
}

impl Default for AgenticConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_results_per_tool: 10,
            final_result_limit: 5,
            min_intersection_matches: 2,
            intersection_mode: IntersectionMode::Auto,
        }
    }
}

/// One executed search, immutable once pushed onto the history.
#[derive(Debug, Clone)]
pub struct SearchRecord {
    pub tool: ToolKind,
    pub query: String,
    pub results: Vec<ScoredMovie>,
    pub reasoning: String,
}

#[derive(Debug)]
pub struct AgenticOutcome {
    pub query: String,
    pub iterations: usize,
    pub history: Vec<SearchRecord>,
    pub results: Vec<MergedMovie>,
    pub total_unique_results: usize,
}

pub struct AgenticSearch {
    tools: Vec<Arc<dyn SearchTool>>,
    planner: Planner,
    completions: Option<Arc<dyn CompletionClient>>,
    config: AgenticConfig,
}

impl AgenticSearch {
    pub fn new(
        tools: Vec<Arc<dyn SearchTool>>,
        completions: Option<Arc<dyn CompletionClient>>,
        config: AgenticConfig,
    ) -> Self {
        Self {
            tools,
            planner: Planner::new(completions.clone()),
            completions,
            config,
        }
    }

    /// Run the full loop for one query. Always returns an outcome; partial
    /// results are valid when the deadline fires mid-search.
    pub async fn run(&self, query: &str, deadline: &Deadline) -> AgenticOutcome {
        let mut used: HashSet<(ToolKind, String)> = HashSet::new();
        let mut history: Vec<SearchRecord> = Vec::new();
        let mut pool: HashMap<MovieId, ScoredMovie> = HashMap::new();
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            if deadline.expired() {
                tracing::info!(iterations, "deadline reached, merging what we have");
                break;
            }

            let pool_top = pool_summary(&pool);
            let decision = self
                .planner
                .plan(query, &self.tools, &history, &pool_top, &used)
                .await;
            let (tool_kind, tool_query, reasoning) = match decision {
                PlanDecision::Run {
                    tool,
                    query,
                    reasoning,
                } => (tool, query, reasoning),
                PlanDecision::Stop => break,
            };

            // Hard guard: a repeated (tool, query) pair ends the loop.
            if !used.insert((tool_kind, tool_query.clone())) {
                tracing::warn!(tool = %tool_kind, query = %tool_query, "planner repeated a pair, stopping");
                break;
            }
            iterations += 1;

            let results = self.execute(tool_kind, &tool_query).await;
            for movie in &results {
                pool.entry(movie.id)
                    .and_modify(|best| {
                        if movie.score > best.score {
                            *best = movie.clone();
                        }
                    })
                    .or_insert_with(|| movie.clone());
            }
            tracing::debug!(
                iteration = iterations,
                tool = %tool_kind,
                query = %tool_query,
                results = results.len(),
                pool = pool.len(),
                "iteration complete"
            );
            history.push(SearchRecord {
                tool: tool_kind,
                query: tool_query,
                results,
                reasoning,
            });

            if self.should_exit_early(&history, pool.len()) {
                tracing::debug!("actor and genre both contributed, exiting early");
                break;
            }
        }

        let mut merged = merge_auto(
            &history,
            self.config.intersection_mode,
            self.config.min_intersection_matches,
        );
        merged.truncate(self.config.final_result_limit);

        if !deadline.expired() {
            self.rerank_final(query, &mut merged).await;
        }

        AgenticOutcome {
            query: query.to_string(),
            iterations,
            history,
            results: merged,
            total_unique_results: pool.len(),
        }
    }

    async fn execute(&self, kind: ToolKind, query: &str) -> Vec<ScoredMovie> {
        let Some(tool) = self.tools.iter().find(|t| t.kind() == kind) else {
            tracing::warn!(tool = %kind, "planner chose an unavailable tool");
            return Vec::new();
        };
        match tool.search(query, self.config.max_results_per_tool).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(tool = %kind, error = %e, "tool failed, treating as zero results");
                Vec::new()
            }
        }
    }

    fn should_exit_early(&self, history: &[SearchRecord], pool_size: usize) -> bool {
        let actor = history
            .iter()
            .any(|r| r.tool == ToolKind::ActorSearch && !r.results.is_empty());
        let genre = history
            .iter()
            .any(|r| r.tool == ToolKind::GenreSearch && !r.results.is_empty());
        actor && genre && pool_size >= self.config.final_result_limit
    }

    /// Final relevance pass over the truncated merge. Discarded unless at
    /// least half the candidates come back with a parseable score.
    async fn rerank_final(&self, query: &str, merged: &mut Vec<MergedMovie>) {
        let Some(completions) = &self.completions else {
            return;
        };
        if merged.len() < 2 {
            return;
        }

        let mut listing = String::new();
        for (i, movie) in merged.iter().enumerate() {
            listing.push_str(&format!("{i}. {}: {}\n", movie.title, movie.description));
        }
        let prompt = format!(
            "Rate how well each movie answers the query \"{query}\" on a 0.0-1.0 scale.\n\
             Movies:\n{listing}\n\
             Reply with JSON only: {{\"scores\": [{{\"index\": 0, \"score\": 0.8}}, ...]}}."
        );

        let reply =
            match complete_bounded(completions.as_ref(), &prompt, COMPLETION_TIMEOUT).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "final rerank call failed, keeping merge order");
                    return;
                }
            };
        let Some(scores) = parse_rerank_reply(&reply, merged.len()) else {
            tracing::warn!("unparseable final rerank reply, keeping merge order");
            return;
        };
        if scores.len() * 2 < merged.len() {
            tracing::warn!(
                scored = scores.len(),
                total = merged.len(),
                "final rerank scored under half the candidates, discarding"
            );
            return;
        }
        for (index, score) in scores {
            merged[index].score = score;
        }
        merged.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    /// Search, then feed the merged results and the history summary back to
    /// the completion service for a cited prose answer. A failed generation
    /// still returns the search outcome.
    pub async fn search_and_generate(
        &self,
        query: &str,
        deadline: &Deadline,
    ) -> (AgenticOutcome, Option<String>) {
        let outcome = self.run(query, deadline).await;
        let Some(completions) = &self.completions else {
            return (outcome, None);
        };
        if outcome.results.is_empty() {
            return (outcome, None);
        }

        let mut listing = String::new();
        for movie in &outcome.results {
            listing.push_str(&format!("- {}: {}\n", movie.title, movie.description));
        }
        let mut searches = String::new();
        for record in &outcome.history {
            searches.push_str(&format!(
                "- {} \"{}\" ({} results)\n",
                record.tool,
                record.query,
                record.results.len()
            ));
        }
        let prompt = format!(
            "Answer the question \"{query}\" using only these movies, citing titles:\n\
             {listing}\nSearches performed:\n{searches}"
        );
        match complete_bounded(completions.as_ref(), &prompt, COMPLETION_TIMEOUT).await {
            Ok(answer) if !answer.trim().is_empty() => (outcome, Some(answer)),
            Ok(_) => (outcome, None),
            Err(e) => {
                tracing::warn!(error = %e, "answer generation failed");
                (outcome, None)
            }
        }
    }
}

#[derive(Deserialize)]
struct RerankEntry {
    index: usize,
    score: f32,
}

#[derive(Deserialize)]
struct RerankReply {
    scores: Vec<RerankEntry>,
}

fn parse_rerank_reply(reply: &str, len: usize) -> Option<Vec<(usize, f32)>> {
    let value = extract_json_object(reply)?;
    let parsed: RerankReply = serde_json::from_value(value).ok()?;
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in parsed.scores {
        if entry.index < len && seen.insert(entry.index) {
            out.push((entry.index, entry.score));
        }
    }
    Some(out)
}

fn pool_summary(pool: &HashMap<MovieId, ScoredMovie>) -> Vec<ScoredMovie> {
    let mut top: Vec<ScoredMovie> = pool.values().cloned().collect();
    top.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    top
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rerank_reply_rejects_out_of_range_and_duplicate_indices() {
        let reply = r#"{"scores": [{"index": 0, "score": 0.9}, {"index": 0, "score": 0.1}, {"index": 7, "score": 0.5}]}"#;
        let scores = parse_rerank_reply(reply, 3).expect("parse");
        assert_eq!(scores, vec![(0, 0.9)]);
    }

    #[test]
    fn pool_summary_is_sorted_descending() {
        let mut pool = HashMap::new();
        for (id, score) in [(1u32, 0.2f32), (2, 0.9), (3, 0.5)] {
            pool.insert(
                id,
                ScoredMovie {
                    id,
                    title: String::new(),
                    description: String::new(),
                    score,
                },
            );
        }
        let top = pool_summary(&pool);
        assert_eq!(top[0].id, 2);
        assert_eq!(top[2].id, 1);
    }
}
