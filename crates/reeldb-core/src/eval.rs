//! Offline relevance evaluation against a judgments file.
//!
//! A judgments file maps queries to the movie ids a human (or prior judge
//! run) marked relevant; any search mode can then be scored with
//! precision@k and reciprocal rank without an external judge in the loop.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{MovieId, ScoredMovie};

/// One judged query: the ids listed are relevant, everything else is not.
#[derive(Debug, Clone, Deserialize)]
pub struct Judgment {
    pub query: String,
    pub relevant: HashSet<MovieId>,
}

/// Load a judgments file of shape `{ "judgments": [ ... ] }`.
pub fn load_judgments(path: &Path) -> Result<Vec<Judgment>> {
    #[derive(Deserialize)]
    struct JudgmentFile {
        judgments: Vec<Judgment>,
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidConfig(format!("cannot read {}: {e}", path.display())))?;
    let file: JudgmentFile = serde_json::from_str(&raw).map_err(|e| {
        Error::InvalidConfig(format!("{} is not a judgments file: {e}", path.display()))
    })?;
    if file.judgments.is_empty() {
        return Err(Error::InvalidConfig(format!(
            "{} holds no judgments",
            path.display()
        )));
    }
    for judgment in &file.judgments {
        if judgment.query.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "judgment with an empty query".to_string(),
            ));
        }
    }
    Ok(file.judgments)
}

/// Fraction of the top `k` results that are relevant. An empty result list
/// scores 0.0; `k` is clamped to the result count actually available.
pub fn precision_at_k(results: &[ScoredMovie], relevant: &HashSet<MovieId>, k: usize) -> f32 {
    let top: Vec<_> = results.iter().take(k).collect();
    if top.is_empty() {
        return 0.0;
    }
    let hits = top.iter().filter(|r| relevant.contains(&r.id)).count();
    hits as f32 / top.len() as f32
}

/// `1/rank` of the first relevant result (1-indexed), 0.0 when none appears.
pub fn reciprocal_rank(results: &[ScoredMovie], relevant: &HashSet<MovieId>) -> f32 {
    results
        .iter()
        .position(|r| relevant.contains(&r.id))
        .map_or(0.0, |i| 1.0 / (i as f32 + 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Movie;

    fn results(ids: &[u32]) -> Vec<ScoredMovie> {
        ids.iter()
            .map(|&id| {
                ScoredMovie::from_movie(
                    &Movie {
                        id,
                        title: format!("m{id}"),
                        description: String::new(),
                        cast: vec![],
                        genres: vec![],
                    },
                    1.0,
                )
            })
            .collect()
    }

    #[test]
    fn precision_counts_hits_in_the_top_k() {
        let relevant: HashSet<u32> = [1, 3].into_iter().collect();
        let ranked = results(&[1, 2, 3, 4]);
        assert!((precision_at_k(&ranked, &relevant, 2) - 0.5).abs() < 1e-6);
        assert!((precision_at_k(&ranked, &relevant, 4) - 0.5).abs() < 1e-6);
        assert!((precision_at_k(&ranked, &relevant, 1) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn short_result_lists_divide_by_what_was_returned() {
        let relevant: HashSet<u32> = [1].into_iter().collect();
        let ranked = results(&[1]);
        assert!((precision_at_k(&ranked, &relevant, 10) - 1.0).abs() < 1e-6);
        assert!((precision_at_k(&[], &relevant, 10) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn reciprocal_rank_rewards_the_first_hit() {
        let relevant: HashSet<u32> = [3].into_iter().collect();
        let ranked = results(&[5, 3, 1]);
        assert!((reciprocal_rank(&ranked, &relevant) - 0.5).abs() < 1e-6);
        assert!((reciprocal_rank(&ranked, &HashSet::new()) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn judgments_file_round_trips() {
        let tmp = tempfile::NamedTempFile::new().expect("tmp");
        std::fs::write(
            tmp.path(),
            r#"{"judgments": [{"query": "bear in london", "relevant": [1, 2]}]}"#,
        )
        .expect("write");
        let judgments = load_judgments(tmp.path()).expect("load");
        assert_eq!(judgments.len(), 1);
        assert!(judgments[0].relevant.contains(&2));

        std::fs::write(tmp.path(), r#"{"judgments": []}"#).expect("write");
        assert!(load_judgments(tmp.path()).is_err());
    }
}
