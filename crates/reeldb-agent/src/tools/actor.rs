//! Actor matcher: pulls candidate person names out of the query, then scores
//! movies by how strongly their cast list matches those names, blended with a
//! BM25 recall signal so title/description mentions still count.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;

use reeldb_core::types::{Movie, MovieId, ScoredMovie};
use reeldb_index::InvertedIndex;

use super::{SearchTool, ToolKind};

/// Extra recall pulled from BM25 before strength scoring.
const RECALL_MULTIPLIER: usize = 3;
/// A fuzzy cast match below this similarity does not count.
const FUZZY_FLOOR: f32 = 0.8;

static FILLER_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "a", "an", "the", "movie", "movies", "film", "films", "show", "shows", "with",
        "starring", "featuring", "starred", "features", "cast", "actor", "actress", "by",
        "find", "me", "some", "any", "in", "of", "about", "that", "played",
    ])
});

/// Split a query into candidate person names: separator split first, then
/// filler-word stripping per segment.
pub fn parse_names(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut names = Vec::new();
    for segment in lowered.split([',', ';']).flat_map(|s| s.split(" and ")).flat_map(|s| s.split(" or ")) {
        let words: Vec<&str> = segment
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty() && !FILLER_WORDS.contains(w))
            .collect();
        if !words.is_empty() {
            names.push(words.join(" "));
        }
    }
    names
}

fn char_bigrams(text: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Dice coefficient over character bigrams.
fn bigram_similarity(a: &str, b: &str) -> f32 {
    let ba = char_bigrams(a);
    let bb = char_bigrams(b);
    if ba.is_empty() || bb.is_empty() {
        return 0.0;
    }
    let shared = ba.intersection(&bb).count() as f32;
    2.0 * shared / (ba.len() + bb.len()) as f32
}

/// Match strength of one name against one cast member.
fn name_strength(name: &str, cast_member: &str) -> f32 {
    let member = cast_member.to_lowercase();
    if member == name || member.contains(name) || name.contains(&member) {
        return 1.0;
    }
    let name_last = name.split_whitespace().last();
    let member_last = member.split_whitespace().last();
    if let (Some(a), Some(b)) = (name_last, member_last) {
        if a == b {
            return 0.9;
        }
    }
    let sim = bigram_similarity(name, &member);
    if sim >= FUZZY_FLOOR {
        sim
    } else {
        0.0
    }
}

pub struct ActorSearchTool {
    movies: Arc<Vec<Movie>>,
    index: Arc<InvertedIndex>,
}

impl ActorSearchTool {
    pub fn new(movies: Arc<Vec<Movie>>, index: Arc<InvertedIndex>) -> Self {
        Self { movies, index }
    }

    fn best_strength(movie: &Movie, names: &[String]) -> f32 {
        let mut best = 0.0f32;
        for name in names {
            for member in &movie.cast {
                best = best.max(name_strength(name, member));
            }
        }
        best
    }
}

#[async_trait]
impl SearchTool for ActorSearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ActorSearch
    }

    fn description(&self) -> &'static str {
        "cast-list matching for person names; best for 'with X' / 'starring X' queries"
    }

    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<ScoredMovie>> {
        let names = parse_names(query);
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let recall = self
            .index
            .bm25_search(&names.join(" "), limit * RECALL_MULTIPLIER);
        let bm25_by_id: HashMap<MovieId, f32> =
            recall.iter().map(|r| (r.id, r.score)).collect();

        // Cast lists are not indexed, so the corpus scan is the primary
        // signal and BM25 only sweetens movies that also mention the name.
        let mut out: Vec<ScoredMovie> = Vec::new();
        for movie in self.movies.iter() {
            let strength = Self::best_strength(movie, &names);
            if strength <= 0.0 {
                continue;
            }
            let bm25 = bm25_by_id.get(&movie.id).copied().unwrap_or(0.0);
            let score = 0.6 * strength + 0.4 * (bm25 / (bm25 + 1.0));
            out.push(ScoredMovie::from_movie(movie, score));
        }
        out.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        out.truncate(limit);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_out_of_conversational_queries() {
        assert_eq!(
            parse_names("movies with Tom Hanks and Meg Ryan"),
            vec!["tom hanks".to_string(), "meg ryan".to_string()]
        );
        assert_eq!(parse_names("starring Denzel Washington"), vec!["denzel washington"]);
        assert!(parse_names("movies with").is_empty());
    }

    #[test]
    fn full_name_beats_last_name_beats_fuzzy() {
        assert!((name_strength("tom hanks", "Tom Hanks") - 1.0).abs() < f32::EPSILON);
        assert!((name_strength("colin hanks", "Tom Hanks") - 0.9).abs() < f32::EPSILON);
        assert_eq!(name_strength("tom hanks", "Meg Ryan"), 0.0);
    }

    #[test]
    fn fuzzy_match_requires_high_bigram_overlap() {
        // One-character typo keeps most bigrams in common.
        let sim = name_strength("tom hankss", "Tom Hankse");
        assert!(sim >= FUZZY_FLOOR || sim == 0.0);
        assert_eq!(name_strength("zz", "Tom Hanks"), 0.0);
    }

    #[tokio::test]
    async fn cast_match_found_without_description_mention() {
        let movies = Arc::new(vec![
            Movie {
                id: 1,
                title: "Big".to_string(),
                description: "a boy wakes up grown".to_string(),
                cast: vec!["Tom Hanks".to_string()],
                genres: vec![],
            },
            Movie {
                id: 2,
                title: "Other".to_string(),
                description: "something else entirely".to_string(),
                cast: vec!["Meg Ryan".to_string()],
                genres: vec![],
            },
        ]);
        let mut index = InvertedIndex::new();
        index.build(&movies).expect("build");
        let tool = ActorSearchTool::new(movies, Arc::new(index));

        let out = tool.search("movies with Tom Hanks", 5).await.expect("search");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 1);
        assert!(out[0].score >= 0.6);
    }
}
