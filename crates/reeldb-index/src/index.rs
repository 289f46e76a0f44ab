//! Inverted index with BM25 scoring over the movie catalog.
//!
//! Postings, per-document term frequencies, document lengths and the
//! id→movie map are persisted as one atomic artifact; a load never leaves
//! the index partially populated.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use reeldb_core::error::{Error, Result};
use reeldb_core::store::INDEX_ARTIFACT;
use reeldb_core::traits::ArtifactStore;
use reeldb_core::types::{Movie, MovieId, ScoredMovie};

use crate::tokenize::tokenize;

/// Tunable BM25 parameters. Defaults are the usual k1 = 1.5, b = 0.75.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    /// token → set of documents containing it. BTreeSet keeps the per-term
    /// document order deterministic between runs.
    postings: HashMap<String, BTreeSet<MovieId>>,
    /// (document, token) → raw term frequency.
    term_freqs: HashMap<MovieId, HashMap<String, u32>>,
    /// document → token count of its indexed text.
    doc_lengths: HashMap<MovieId, u32>,
    doc_map: BTreeMap<MovieId, Movie>,
    /// Original corpus order, used as the stable tie-break.
    doc_order: Vec<MovieId>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn doc_count(&self) -> usize {
        self.doc_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_order.is_empty()
    }

    pub fn movie(&self, id: MovieId) -> Option<&Movie> {
        self.doc_map.get(&id)
    }

    /// Tokenize title + description for every movie and populate postings,
    /// term frequencies and document lengths. Always starts from a clean
    /// slate, so repeated builds over the same corpus are idempotent.
    pub fn build(&mut self, movies: &[Movie]) -> Result<()> {
        if movies.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        *self = Self::default();
        for movie in movies {
            self.add_document(movie);
        }
        tracing::debug!(
            docs = self.doc_count(),
            terms = self.postings.len(),
            "built inverted index"
        );
        Ok(())
    }

    fn add_document(&mut self, movie: &Movie) {
        let tokens = tokenize(&movie.search_text());
        let mut freqs: HashMap<String, u32> = HashMap::new();
        for token in &tokens {
            *freqs.entry(token.clone()).or_insert(0) += 1;
            self.postings.entry(token.clone()).or_default().insert(movie.id);
        }
        self.doc_lengths.insert(movie.id, tokens.len() as u32);
        self.term_freqs.insert(movie.id, freqs);
        self.doc_map.insert(movie.id, movie.clone());
        self.doc_order.push(movie.id);
    }

    pub fn save(&self, store: &dyn ArtifactStore) -> Result<()> {
        let bytes = serde_json::to_vec(self).map_err(|e| Error::Operation(e.to_string()))?;
        store.put(INDEX_ARTIFACT, &bytes)
    }

    /// Restore the whole index from the store. A missing artifact and a
    /// corrupted one surface as distinct error kinds.
    pub fn load(store: &dyn ArtifactStore) -> Result<Self> {
        let bytes = store.get(INDEX_ARTIFACT)?;
        serde_json::from_slice(&bytes).map_err(|e| Error::CorruptArtifact {
            name: INDEX_ARTIFACT.to_string(),
            cause: e.to_string(),
        })
    }

    /// Load the persisted index, rebuilding (and re-saving) when no copy
    /// exists or when the persisted document count no longer matches the
    /// live corpus.
    pub fn load_or_build(store: &dyn ArtifactStore, movies: &[Movie]) -> Result<Self> {
        if store.exists(INDEX_ARTIFACT) {
            let index = Self::load(store)?;
            if index.doc_count() == movies.len() {
                return Ok(index);
            }
            tracing::info!(
                persisted = index.doc_count(),
                live = movies.len(),
                "corpus changed, rebuilding index"
            );
        }
        let mut index = Self::new();
        index.build(movies)?;
        index.save(store)?;
        Ok(index)
    }

    /// `term` must tokenize to exactly one token.
    fn single_token(term: &str) -> Result<String> {
        let mut tokens = tokenize(term);
        if tokens.len() != 1 {
            return Err(Error::InvalidArgument(format!(
                "expected a single-token term, got {:?} from {term:?}",
                tokens
            )));
        }
        Ok(tokens.remove(0))
    }

    /// Raw term frequency of `term` in the given document (0 when absent).
    pub fn term_frequency(&self, doc_id: MovieId, term: &str) -> Result<u32> {
        let token = Self::single_token(term)?;
        Ok(self
            .term_freqs
            .get(&doc_id)
            .and_then(|freqs| freqs.get(&token))
            .copied()
            .unwrap_or(0))
    }

    fn document_frequency(&self, token: &str) -> usize {
        self.postings.get(token).map_or(0, BTreeSet::len)
    }

    /// Smoothed IDF: `ln((N + 1) / (df + 1))`, always ≥ 0.
    pub fn inverse_document_frequency(&self, term: &str) -> Result<f32> {
        let token = Self::single_token(term)?;
        let n = self.doc_count() as f32;
        let df = self.document_frequency(&token) as f32;
        Ok(((n + 1.0) / (df + 1.0)).ln())
    }

    /// BM25 IDF component: `ln((N − df + 0.5) / (df + 0.5) + 1)`.
    pub fn bm25_idf(&self, term: &str) -> Result<f32> {
        let token = Self::single_token(term)?;
        let n = self.doc_count() as f32;
        let df = self.document_frequency(&token) as f32;
        Ok(((n - df + 0.5) / (df + 0.5) + 1.0).ln())
    }

    /// BM25 length-normalized TF component.
    pub fn bm25_tf(&self, doc_id: MovieId, term: &str, params: Bm25Params) -> Result<f32> {
        let tf = self.term_frequency(doc_id, term)? as f32;
        let dl = self.doc_lengths.get(&doc_id).copied().unwrap_or(0) as f32;
        Ok(Self::bm25_tf_raw(tf, dl, self.average_doc_length(), params))
    }

    fn bm25_tf_raw(tf: f32, dl: f32, avgdl: f32, params: Bm25Params) -> f32 {
        if tf == 0.0 {
            return 0.0;
        }
        let norm = if avgdl > 0.0 { dl / avgdl } else { 0.0 };
        (tf * (params.k1 + 1.0)) / (tf + params.k1 * (1.0 - params.b + params.b * norm))
    }

    fn average_doc_length(&self) -> f32 {
        if self.doc_lengths.is_empty() {
            return 0.0;
        }
        self.doc_lengths.values().map(|&l| l as f32).sum::<f32>() / self.doc_lengths.len() as f32
    }

    /// Full BM25 score of one term against one document.
    pub fn bm25(&self, doc_id: MovieId, term: &str) -> Result<f32> {
        self.bm25_with(doc_id, term, Bm25Params::default())
    }

    pub fn bm25_with(&self, doc_id: MovieId, term: &str, params: Bm25Params) -> Result<f32> {
        Ok(self.bm25_tf(doc_id, term, params)? * self.bm25_idf(term)?)
    }

    /// Rank the whole corpus against `query` by summed per-token BM25.
    /// Ties keep the original document order.
    pub fn bm25_search(&self, query: &str, limit: usize) -> Vec<ScoredMovie> {
        self.bm25_search_with(query, limit, Bm25Params::default())
    }

    pub fn bm25_search_with(
        &self,
        query: &str,
        limit: usize,
        params: Bm25Params,
    ) -> Vec<ScoredMovie> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() || self.is_empty() {
            return Vec::new();
        }

        let avgdl = self.average_doc_length();
        let mut scores: HashMap<MovieId, f32> = HashMap::new();
        for token in &query_tokens {
            let Some(doc_ids) = self.postings.get(token) else {
                continue;
            };
            let df = doc_ids.len() as f32;
            let n = self.doc_count() as f32;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            for &doc_id in doc_ids {
                let tf = self
                    .term_freqs
                    .get(&doc_id)
                    .and_then(|f| f.get(token))
                    .copied()
                    .unwrap_or(0) as f32;
                let dl = self.doc_lengths.get(&doc_id).copied().unwrap_or(0) as f32;
                *scores.entry(doc_id).or_insert(0.0) +=
                    idf * Self::bm25_tf_raw(tf, dl, avgdl, params);
            }
        }

        let order: HashMap<MovieId, usize> = self
            .doc_order
            .iter()
            .enumerate()
            .map(|(pos, &id)| (id, pos))
            .collect();
        let mut ranked: Vec<(MovieId, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| order.get(&a.0).cmp(&order.get(&b.0)))
        });
        ranked
            .into_iter()
            .take(limit)
            .filter_map(|(id, score)| {
                self.doc_map
                    .get(&id)
                    .map(|m| ScoredMovie::from_movie(m, score))
            })
            .collect()
    }

    /// Unranked existence search: up to `limit` documents containing any
    /// query token, in first-seen order across tokens.
    pub fn search(&self, query: &str, limit: usize) -> Vec<ScoredMovie> {
        let query_tokens = tokenize(query);
        let mut seen = BTreeSet::new();
        let mut results = Vec::new();
        for token in &query_tokens {
            let Some(doc_ids) = self.postings.get(token) else {
                continue;
            };
            for &doc_id in doc_ids {
                if results.len() >= limit {
                    return results;
                }
                if seen.insert(doc_id) {
                    if let Some(m) = self.doc_map.get(&doc_id) {
                        results.push(ScoredMovie::from_movie(m, 1.0));
                    }
                }
            }
        }
        results
    }
}
