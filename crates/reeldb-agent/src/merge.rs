//! Merging of per-tool result sets at the end of an orchestration run.
//!
//! Auto-detection picks intersection when an actor match can be corroborated
//! by a genre/keyword/pattern tool, union otherwise. An intersection that
//! qualifies nothing always falls back to a weighted union: the caller never
//! sees an empty screen while any tool produced evidence.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use reeldb_core::types::{MovieId, ScoredMovie};

use crate::orchestrator::SearchRecord;
use crate::tools::{implied_genres, ToolKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntersectionMode {
    /// Required matches scale with the tool count.
    Auto,
    /// Every contributing tool must agree.
    Strict,
    /// The configured minimum is enough.
    Loose,
}

/// One merged result with its provenance.
#[derive(Debug, Clone)]
pub struct MergedMovie {
    pub id: MovieId,
    pub title: String,
    pub description: String,
    /// Aggregate score; semantics depend on the strategy that produced it.
    pub score: f32,
    pub found_by: Vec<ToolKind>,
    pub matched_by_count: usize,
}

impl MergedMovie {
    fn from_scored(movie: &ScoredMovie, score: f32, found_by: Vec<ToolKind>) -> Self {
        let matched_by_count = found_by.len();
        Self {
            id: movie.id,
            title: movie.title.clone(),
            description: movie.description.clone(),
            score,
            found_by,
            matched_by_count,
        }
    }
}

fn sort_merged(merged: &mut Vec<MergedMovie>) {
    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Tools whose agreement with the actor tool justifies an intersection.
const CORROBORATING: [ToolKind; 3] = [
    ToolKind::GenreSearch,
    ToolKind::KeywordSearch,
    ToolKind::PatternSearch,
];

/// Merge the full search history using the auto-detected strategy.
pub fn merge_auto(
    history: &[SearchRecord],
    mode: IntersectionMode,
    min_matches: usize,
) -> Vec<MergedMovie> {
    let contributing: Vec<&SearchRecord> =
        history.iter().filter(|r| !r.results.is_empty()).collect();
    if contributing.is_empty() {
        return Vec::new();
    }

    let tools: HashSet<ToolKind> = contributing.iter().map(|r| r.tool).collect();
    if tools.len() == 1 {
        // Single tool: passthrough, score relabeled as the aggregate.
        let mut merged: Vec<MergedMovie> = Vec::new();
        let mut seen = HashSet::new();
        for record in &contributing {
            for movie in &record.results {
                if seen.insert(movie.id) {
                    merged.push(MergedMovie::from_scored(movie, movie.score, vec![record.tool]));
                }
            }
        }
        sort_merged(&mut merged);
        return merged;
    }

    let actor_present = tools.contains(&ToolKind::ActorSearch);
    let corroborated = CORROBORATING.iter().any(|t| tools.contains(t));
    if actor_present && corroborated {
        let refined = refine_actor_results(&contributing);
        let merged = merge_intersection(&refined, mode, min_matches);
        if !merged.is_empty() {
            return merged;
        }
        tracing::debug!("intersection qualified nothing, falling back to weighted union");
        return merge_union(&contributing, true);
    }
    merge_union(&contributing, false)
}

/// Force a union merge over the history.
pub fn merge_union_all(history: &[SearchRecord]) -> Vec<MergedMovie> {
    let contributing: Vec<&SearchRecord> =
        history.iter().filter(|r| !r.results.is_empty()).collect();
    merge_union(&contributing, false)
}

/// Force an intersection merge; still falls back to a weighted union when
/// nothing qualifies.
pub fn merge_intersection_all(
    history: &[SearchRecord],
    mode: IntersectionMode,
    min_matches: usize,
) -> Vec<MergedMovie> {
    let contributing: Vec<&SearchRecord> =
        history.iter().filter(|r| !r.results.is_empty()).collect();
    let merged = merge_intersection(&contributing, mode, min_matches);
    if merged.is_empty() && !contributing.is_empty() {
        return merge_union(&contributing, true);
    }
    merged
}

/// Drop actor results whose text lacks every genre-implied term from the
/// genre searches. Best effort: if the filter would eliminate everything,
/// the unfiltered results stand.
fn refine_actor_results<'a>(contributing: &[&'a SearchRecord]) -> Vec<SearchRecord> {
    let genre_terms: HashSet<&'static str> = contributing
        .iter()
        .filter(|r| r.tool == ToolKind::GenreSearch)
        .flat_map(|r| implied_genres(&r.query))
        .collect();

    contributing
        .iter()
        .map(|record| {
            if record.tool != ToolKind::ActorSearch || genre_terms.is_empty() {
                return (*record).clone();
            }
            let filtered: Vec<ScoredMovie> = record
                .results
                .iter()
                .filter(|m| {
                    let text = format!("{} {}", m.title, m.description).to_lowercase();
                    genre_terms.iter().any(|t| text.contains(t))
                })
                .cloned()
                .collect();
            let mut refined = (*record).clone();
            if filtered.is_empty() {
                tracing::debug!(
                    tool = %record.tool,
                    "genre refinement would drop every actor result, keeping all"
                );
            } else {
                refined.results = filtered;
            }
            refined
        })
        .collect()
}

fn merge_intersection<R: std::borrow::Borrow<SearchRecord>>(
    contributing: &[R],
    mode: IntersectionMode,
    min_matches: usize,
) -> Vec<MergedMovie> {
    let tools: HashSet<ToolKind> = contributing.iter().map(|r| r.borrow().tool).collect();
    let tool_count = tools.len();
    if tool_count == 0 {
        return Vec::new();
    }
    let required = match mode {
        IntersectionMode::Strict => tool_count,
        IntersectionMode::Loose => min_matches.max(1),
        IntersectionMode::Auto => {
            if tool_count <= 2 {
                tool_count
            } else {
                min_matches.max(tool_count - 1)
            }
        }
    };

    // Per movie: best score per distinct tool.
    let mut per_tool: HashMap<MovieId, HashMap<ToolKind, f32>> = HashMap::new();
    let mut samples: HashMap<MovieId, ScoredMovie> = HashMap::new();
    for record in contributing {
        let record = record.borrow();
        for movie in &record.results {
            let scores = per_tool.entry(movie.id).or_default();
            let entry = scores.entry(record.tool).or_insert(movie.score);
            if movie.score > *entry {
                *entry = movie.score;
            }
            samples.entry(movie.id).or_insert_with(|| movie.clone());
        }
    }

    let mut merged: Vec<MergedMovie> = Vec::new();
    for (id, scores) in &per_tool {
        let matches = scores.len();
        if matches < required {
            continue;
        }
        let mean = scores.values().sum::<f32>() / matches as f32;
        let aggregate = (mean + 0.1 * (matches as f32 - 1.0)).min(1.0);
        let mut found_by: Vec<ToolKind> = scores.keys().copied().collect();
        found_by.sort_by_key(|t| t.as_str());
        if let Some(sample) = samples.get(id) {
            merged.push(MergedMovie::from_scored(sample, aggregate, found_by));
        }
    }
    sort_merged(&mut merged);
    merged
}

fn merge_union(contributing: &[&SearchRecord], fallback_boost: bool) -> Vec<MergedMovie> {
    let mut best: HashMap<MovieId, (f32, ScoredMovie)> = HashMap::new();
    let mut found_by: HashMap<MovieId, Vec<ToolKind>> = HashMap::new();

    for (i, record) in contributing.iter().enumerate() {
        // Later searches ran with more context, so they carry slightly
        // more weight.
        let recency = 1.0 + 0.1 * i as f32;
        let tool_boost = if fallback_boost {
            match record.tool {
                ToolKind::ActorSearch => 1.5,
                ToolKind::GenreSearch => 1.2,
                _ => 1.0,
            }
        } else {
            1.0
        };
        for movie in &record.results {
            let weighted = movie.score * recency * tool_boost;
            let entry = best
                .entry(movie.id)
                .or_insert_with(|| (weighted, movie.clone()));
            if weighted > entry.0 {
                *entry = (weighted, movie.clone());
            }
            let tools = found_by.entry(movie.id).or_default();
            if !tools.contains(&record.tool) {
                tools.push(record.tool);
            }
        }
    }

    let mut merged: Vec<MergedMovie> = best
        .into_iter()
        .map(|(id, (score, movie))| {
            let tools = found_by.remove(&id).unwrap_or_default();
            MergedMovie::from_scored(&movie, score, tools)
        })
        .collect();
    sort_merged(&mut merged);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use reeldb_core::types::ScoredMovie;

    fn scored(id: u32, score: f32) -> ScoredMovie {
        ScoredMovie {
            id,
            title: format!("Movie {id}"),
            description: "a thrilling story".to_string(),
            score,
        }
    }

    fn record(tool: ToolKind, query: &str, results: Vec<ScoredMovie>) -> SearchRecord {
        SearchRecord {
            tool,
            query: query.to_string(),
            results,
            reasoning: String::new(),
        }
    }

    #[test]
    fn two_tool_intersection_requires_both() {
        let history = vec![
            record(ToolKind::ActorSearch, "tom hanks", vec![scored(1, 0.9), scored(2, 0.8)]),
            record(ToolKind::GenreSearch, "thriller", vec![scored(2, 0.7), scored(3, 0.6)]),
        ];
        let merged = merge_auto(&history, IntersectionMode::Auto, 2);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, 2);
        assert_eq!(merged[0].matched_by_count, 2);
        // mean(0.8, 0.7) + 0.1 completeness bonus
        assert!((merged[0].score - 0.85).abs() < 1e-6);
    }

    #[test]
    fn three_tool_auto_intersection_accepts_two_of_three() {
        let history = vec![
            record(ToolKind::ActorSearch, "tom hanks", vec![scored(1, 0.9), scored(2, 0.8)]),
            record(ToolKind::GenreSearch, "thriller", vec![scored(2, 0.7)]),
            record(ToolKind::KeywordSearch, "spy thriller", vec![scored(2, 0.6), scored(9, 0.5)]),
        ];
        let merged = merge_auto(&history, IntersectionMode::Auto, 2);
        let ids: Vec<u32> = merged.iter().map(|m| m.id).collect();
        assert!(ids.contains(&2));
        assert!(!ids.contains(&1), "single-tool movie must not qualify");
        assert!(!ids.contains(&9));
        let top = merged.iter().find(|m| m.id == 2).expect("movie 2");
        assert_eq!(top.matched_by_count, 3);
    }

    #[test]
    fn empty_intersection_falls_back_to_union() {
        let history = vec![
            record(ToolKind::ActorSearch, "tom hanks", vec![scored(1, 0.9), scored(2, 0.8)]),
            record(ToolKind::GenreSearch, "thriller", vec![scored(4, 0.7)]),
        ];
        let merged = merge_auto(&history, IntersectionMode::Auto, 2);
        let ids: HashSet<u32> = merged.iter().map(|m| m.id).collect();
        assert_eq!(ids, HashSet::from([1, 2, 4]));
    }

    #[test]
    fn fallback_union_boosts_actor_over_genre() {
        let history = vec![
            record(ToolKind::ActorSearch, "tom hanks", vec![scored(1, 0.5)]),
            record(ToolKind::GenreSearch, "thriller", vec![scored(4, 0.5)]),
        ];
        let merged = merge_auto(&history, IntersectionMode::Auto, 2);
        // 0.5 * 1.0 recency * 1.5 actor boost vs 0.5 * 1.1 recency * 1.2
        let actor = merged.iter().find(|m| m.id == 1).expect("actor hit");
        let genre = merged.iter().find(|m| m.id == 4).expect("genre hit");
        assert!(actor.score > genre.score);
    }

    #[test]
    fn single_tool_passes_through_relabeled() {
        let history = vec![record(
            ToolKind::HybridSearch,
            "bear",
            vec![scored(5, 0.4), scored(6, 0.3)],
        )];
        let merged = merge_auto(&history, IntersectionMode::Auto, 2);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, 5);
        assert_eq!(merged[0].found_by, vec![ToolKind::HybridSearch]);
    }

    #[test]
    fn union_applies_recency_weight() {
        let history = vec![
            record(ToolKind::KeywordSearch, "bear", vec![scored(1, 0.5)]),
            record(ToolKind::SemanticSearch, "bear", vec![scored(2, 0.5)]),
        ];
        let merged = merge_auto(&history, IntersectionMode::Auto, 2);
        let first = merged.iter().find(|m| m.id == 1).expect("first");
        let second = merged.iter().find(|m| m.id == 2).expect("second");
        assert!((first.score - 0.5).abs() < 1e-6);
        assert!((second.score - 0.55).abs() < 1e-6);
    }

    #[test]
    fn genre_refinement_filters_actor_results_by_genre_term() {
        let mut thriller = scored(1, 0.9);
        thriller.description = "a tense thriller at sea".to_string();
        let mut comedy = scored(2, 0.8);
        comedy.description = "light laughs".to_string();
        let history = vec![
            record(ToolKind::ActorSearch, "tom hanks", vec![thriller, comedy, scored(3, 0.7)]),
            record(ToolKind::GenreSearch, "thriller", vec![scored(1, 0.6), scored(3, 0.5)]),
        ];
        let merged = merge_auto(&history, IntersectionMode::Auto, 2);
        let ids: Vec<u32> = merged.iter().map(|m| m.id).collect();
        // Movie 2 is refined away; movie 3 lacks the term in its text, so
        // only movie 1 survives both refinement and intersection.
        assert!(ids.contains(&1));
        assert!(!ids.contains(&2));
    }

    #[test]
    fn strict_mode_requires_all_tools() {
        let history = vec![
            record(ToolKind::ActorSearch, "x", vec![scored(1, 0.9), scored(2, 0.8)]),
            record(ToolKind::GenreSearch, "drama", vec![scored(2, 0.7)]),
            record(ToolKind::KeywordSearch, "y", vec![scored(1, 0.6)]),
        ];
        let merged = merge_intersection_all(&history, IntersectionMode::Strict, 1);
        // Nothing is in all three sets; strict falls back to union.
        assert!(merged.len() > 1);
    }

    #[test]
    fn aggregate_score_is_capped_at_one() {
        let history = vec![
            record(ToolKind::ActorSearch, "x", vec![scored(1, 1.0)]),
            record(ToolKind::GenreSearch, "drama", vec![scored(1, 1.0)]),
        ];
        let merged = merge_auto(&history, IntersectionMode::Auto, 2);
        assert!((merged[0].score - 1.0).abs() < 1e-6);
    }
}
