//! Genre matcher: maps query words through a synonym table to canonical
//! genres, then scores movies by how many of the requested genres they
//! satisfy, either via genre metadata or via description text.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;

use reeldb_core::types::{Movie, ScoredMovie};

use super::{SearchTool, ToolKind};

/// Query word → canonical genre. Identity entries let plain genre names
/// through; the rest cover the phrasings people actually type.
pub static GENRE_SYNONYMS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("action", "action"),
        ("adventure", "adventure"),
        ("animation", "animation"),
        ("animated", "animation"),
        ("cartoon", "animation"),
        ("comedy", "comedy"),
        ("funny", "comedy"),
        ("hilarious", "comedy"),
        ("comedies", "comedy"),
        ("crime", "crime"),
        ("heist", "crime"),
        ("gangster", "crime"),
        ("noir", "crime"),
        ("documentary", "documentary"),
        ("drama", "drama"),
        ("dramas", "drama"),
        ("family", "family"),
        ("kids", "family"),
        ("children", "family"),
        ("fantasy", "fantasy"),
        ("magical", "fantasy"),
        ("wizard", "fantasy"),
        ("horror", "horror"),
        ("scary", "horror"),
        ("frightening", "horror"),
        ("spooky", "horror"),
        ("musical", "musical"),
        ("mystery", "mystery"),
        ("detective", "mystery"),
        ("whodunit", "mystery"),
        ("romance", "romance"),
        ("romantic", "romance"),
        ("love", "romance"),
        ("scifi", "science fiction"),
        ("sci-fi", "science fiction"),
        ("futuristic", "science fiction"),
        ("space", "science fiction"),
        ("thriller", "thriller"),
        ("suspense", "thriller"),
        ("suspenseful", "thriller"),
        ("war", "war"),
        ("western", "western"),
        ("cowboy", "western"),
    ])
});

/// Canonical genres implied by a free-text query.
pub fn implied_genres(query: &str) -> HashSet<&'static str> {
    query
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter_map(|word| GENRE_SYNONYMS.get(word.trim_matches(|c: char| !c.is_alphanumeric() && c != '-')))
        .copied()
        .collect()
}

pub struct GenreSearchTool {
    movies: Arc<Vec<Movie>>,
}

impl GenreSearchTool {
    pub fn new(movies: Arc<Vec<Movie>>) -> Self {
        Self { movies }
    }

    fn score_movie(movie: &Movie, requested: &HashSet<&'static str>) -> Option<(f32, Vec<&'static str>)> {
        let meta: HashSet<String> = movie.genres.iter().map(|g| g.to_lowercase()).collect();
        let text = movie.search_text().to_lowercase();

        let mut matched = Vec::new();
        let mut meta_hit = false;
        let mut text_hit = false;
        for &genre in requested {
            let in_meta = meta.contains(genre);
            let in_text = text.contains(genre);
            if in_meta || in_text {
                matched.push(genre);
            }
            meta_hit |= in_meta;
            text_hit |= in_text;
        }
        if matched.is_empty() {
            return None;
        }

        let coverage = matched.len() as f32 / requested.len() as f32;
        let mut score = 0.4 * coverage;
        if meta_hit {
            score += 0.4;
        }
        if text_hit {
            score += 0.2;
        }
        Some((score.min(1.0), matched))
    }
}

#[async_trait]
impl SearchTool for GenreSearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GenreSearch
    }

    fn description(&self) -> &'static str {
        "genre and mood matching via a synonym table; best for 'scary', 'funny', genre names"
    }

    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<ScoredMovie>> {
        let requested = implied_genres(query);
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let mut out: Vec<ScoredMovie> = Vec::new();
        for movie in self.movies.iter() {
            if let Some((score, matched)) = Self::score_movie(movie, &requested) {
                tracing::debug!(
                    movie = movie.id,
                    ?matched,
                    score,
                    "genre match"
                );
                out.push(ScoredMovie::from_movie(movie, score));
            }
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
