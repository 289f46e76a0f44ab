//! Corpus loader for the movie catalog file.
//!
//! The catalog has shape `{ "movies": [ ... ] }`. Legacy records are
//! tolerated: `cast` may be a list of strings or of `{ "name": ... }`
//! objects, and `genre`/`genres` may be a bare string instead of a list.
//! Records are validated at load time; the loaded list is never mutated
//! downstream.

use serde::de::{Deserializer, Error as DeError};
use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Movie;

#[derive(Deserialize)]
struct Catalog {
    movies: Vec<Movie>,
}

/// Load and validate the full movie catalog.
pub fn load_movies(path: &Path) -> Result<Vec<Movie>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidConfig(format!("cannot read {}: {e}", path.display())))?;
    let catalog: Catalog = serde_json::from_str(&raw).map_err(|e| {
        Error::InvalidConfig(format!("{} is not a valid catalog: {e}", path.display()))
    })?;
    if catalog.movies.is_empty() {
        return Err(Error::EmptyCorpus);
    }
    let mut seen = std::collections::HashSet::new();
    for movie in &catalog.movies {
        if !seen.insert(movie.id) {
            return Err(Error::InvalidConfig(format!(
                "duplicate movie id {} in {}",
                movie.id,
                path.display()
            )));
        }
    }
    Ok(catalog.movies)
}

/// Cast member entries appear either as plain strings or as objects
/// carrying a `name` key, depending on catalog vintage.
pub fn de_cast<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CastEntry {
        Name(String),
        Credit { name: String },
    }

    let entries: Vec<CastEntry> = Vec::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|e| match e {
            CastEntry::Name(name) | CastEntry::Credit { name } => name,
        })
        .collect())
}

/// Genre lists from older catalog dumps are sometimes a single string.
pub fn de_genres<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum GenreField {
        One(String),
        Many(Vec<String>),
    }

    match GenreField::deserialize(deserializer)? {
        GenreField::One(g) => Ok(vec![g]),
        GenreField::Many(gs) => {
            if gs.iter().any(String::is_empty) {
                return Err(D::Error::custom("empty genre string"));
            }
            Ok(gs)
        }
    }
}
