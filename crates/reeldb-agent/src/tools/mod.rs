//! Search tool adapters: a closed set of retrieval strategies behind one
//! interface so the orchestrator can dispatch on a planner decision. Every
//! tool receives its dependencies at construction.

mod actor;
mod genre;

pub use actor::ActorSearchTool;
pub use genre::{implied_genres, GenreSearchTool, GENRE_SYNONYMS};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use reeldb_core::types::{Movie, ScoredMovie};
use reeldb_fusion::{FusionEngine, DEFAULT_RRF_K};
use reeldb_index::InvertedIndex;
use reeldb_semantic::DocSemanticSearch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    KeywordSearch,
    SemanticSearch,
    HybridSearch,
    PatternSearch,
    GenreSearch,
    ActorSearch,
}

impl ToolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeywordSearch => "keyword_search",
            Self::SemanticSearch => "semantic_search",
            Self::HybridSearch => "hybrid_search",
            Self::PatternSearch => "pattern_search",
            Self::GenreSearch => "genre_search",
            Self::ActorSearch => "actor_search",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "keyword_search" => Some(Self::KeywordSearch),
            "semantic_search" => Some(Self::SemanticSearch),
            "hybrid_search" => Some(Self::HybridSearch),
            "pattern_search" => Some(Self::PatternSearch),
            "genre_search" => Some(Self::GenreSearch),
            "actor_search" => Some(Self::ActorSearch),
            _ => None,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform retrieval interface. Tools never fail the orchestration loop;
/// internal errors surface as `Err` and the caller downgrades them to zero
/// results.
#[async_trait]
pub trait SearchTool: Send + Sync {
    fn kind(&self) -> ToolKind;
    fn description(&self) -> &'static str;
    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<ScoredMovie>>;
}

/// BM25 ranking over the shared inverted index.
pub struct KeywordSearchTool {
    index: Arc<InvertedIndex>,
}

impl KeywordSearchTool {
    pub fn new(index: Arc<InvertedIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl SearchTool for KeywordSearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::KeywordSearch
    }

    fn description(&self) -> &'static str {
        "BM25 keyword ranking over titles and descriptions; best for exact terms"
    }

    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<ScoredMovie>> {
        Ok(self.index.bm25_search(query, limit))
    }
}

/// Whole-document embedding similarity.
pub struct SemanticSearchTool {
    docs: Arc<DocSemanticSearch>,
}

impl SemanticSearchTool {
    pub fn new(docs: Arc<DocSemanticSearch>) -> Self {
        Self { docs }
    }
}

#[async_trait]
impl SearchTool for SemanticSearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SemanticSearch
    }

    fn description(&self) -> &'static str {
        "embedding similarity over whole descriptions; best for themes and moods"
    }

    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<ScoredMovie>> {
        self.docs.search(query, limit).await
    }
}

/// Reciprocal-rank fusion of the lexical and semantic rankings.
pub struct HybridSearchTool {
    fusion: Arc<FusionEngine>,
}

impl HybridSearchTool {
    pub fn new(fusion: Arc<FusionEngine>) -> Self {
        Self { fusion }
    }
}

#[async_trait]
impl SearchTool for HybridSearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::HybridSearch
    }

    fn description(&self) -> &'static str {
        "fused keyword + semantic ranking; the general-purpose default"
    }

    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<ScoredMovie>> {
        let hits = self.fusion.rrf(query, DEFAULT_RRF_K, limit).await;
        Ok(hits.into_iter().map(ScoredMovie::from).collect())
    }
}

/// Ordered-word regex matcher: the query words must all appear, in order,
/// anywhere in a movie's title or description. Every match scores 1.0.
pub struct PatternSearchTool {
    movies: Arc<Vec<Movie>>,
}

impl PatternSearchTool {
    pub fn new(movies: Arc<Vec<Movie>>) -> Self {
        Self { movies }
    }

    fn build_pattern(query: &str) -> Option<regex::Regex> {
        let words: Vec<String> = query
            .split_whitespace()
            .map(regex::escape)
            .collect();
        if words.is_empty() {
            return None;
        }
        let pattern = words
            .iter()
            .map(|w| format!(r"\b{w}\b"))
            .collect::<Vec<_>>()
            .join(".*");
        RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .ok()
    }
}

#[async_trait]
impl SearchTool for PatternSearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::PatternSearch
    }

    fn description(&self) -> &'static str {
        "literal phrase/pattern matching in order; best for quoted wording"
    }

    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<ScoredMovie>> {
        let Some(re) = Self::build_pattern(query) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for movie in self.movies.iter() {
            let text = movie.search_text();
            if re.is_match(&text) {
                out.push(ScoredMovie::from_movie(movie, 1.0));
                if out.len() >= limit {
                    break;
                }
            }
        }
        Ok(out)
    }
}
