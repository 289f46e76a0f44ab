//! Domain types shared by the lexical, semantic and agentic engines.

use serde::{Deserialize, Serialize};

pub type MovieId = u32;

/// A single catalog entry. Immutable once loaded; every engine holds a
/// shared read-only slice of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub description: String,
    #[serde(default, deserialize_with = "crate::corpus::de_cast")]
    pub cast: Vec<String>,
    #[serde(
        default,
        alias = "genre",
        deserialize_with = "crate::corpus::de_genres"
    )]
    pub genres: Vec<String>,
}

impl Movie {
    /// The text the lexical index and the document embedder see.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// The minimal surface returned by every search tool and engine.
/// `score` is engine-specific but higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMovie {
    pub id: MovieId,
    pub title: String,
    pub description: String,
    pub score: f32,
}

impl ScoredMovie {
    pub fn from_movie(movie: &Movie, score: f32) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            description: movie.description.clone(),
            score,
        }
    }
}
