//! Deterministic tokenizer: lowercase, strip punctuation, drop stop words,
//! stem. The stemmer is a trait so callers can swap the algorithm; whatever
//! is chosen must be applied to documents and queries alike.

use std::collections::HashSet;
use std::sync::LazyLock;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "had", "has",
        "have", "he", "her", "his", "i", "if", "in", "into", "is", "it", "its", "no", "not", "of",
        "on", "or", "she", "so", "such", "that", "the", "their", "them", "then", "there", "these",
        "they", "this", "to", "was", "were", "will", "with", "you",
    ]
    .into_iter()
    .collect()
});

pub trait Stemmer: Send + Sync {
    fn stem(&self, word: &str) -> String;
}

/// Small deterministic suffix stripper. Not Porter; just enough to collapse
/// plurals, participles and adverbs onto a common stem.
#[derive(Debug, Default, Clone, Copy)]
pub struct SuffixStemmer;

impl Stemmer for SuffixStemmer {
    fn stem(&self, word: &str) -> String {
        let w = word;
        if let Some(stem) = w.strip_suffix("ies") {
            if stem.len() >= 2 {
                return format!("{stem}y");
            }
        }
        if let Some(stem) = w.strip_suffix("sses") {
            return format!("{stem}ss");
        }
        if let Some(stem) = w.strip_suffix("ing") {
            if stem.len() >= 3 {
                return stem.to_string();
            }
        }
        if let Some(stem) = w.strip_suffix("ed") {
            if stem.len() >= 3 {
                return stem.to_string();
            }
        }
        if let Some(stem) = w.strip_suffix("ly") {
            if stem.len() >= 3 {
                return stem.to_string();
            }
        }
        if w.len() > 3 && w.ends_with('s') && !w.ends_with("ss") && !w.ends_with("us") {
            return w[..w.len() - 1].to_string();
        }
        w.to_string()
    }
}

/// Tokenize with the default stemmer.
pub fn tokenize(text: &str) -> Vec<String> {
    tokenize_with(text, &SuffixStemmer)
}

pub fn tokenize_with(text: &str, stemmer: &dyn Stemmer) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1 && !STOP_WORDS.contains(t))
        .map(|t| stemmer.stem(t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_stop_words_and_punctuation() {
        let tokens = tokenize("The bear, in London!");
        assert_eq!(tokens, vec!["bear", "london"]);
    }

    #[test]
    fn stems_plurals_and_participles() {
        assert_eq!(tokenize("movies"), vec!["movy"]);
        assert_eq!(tokenize("running"), vec!["runn"]);
        assert_eq!(tokenize("walked"), vec!["walk"]);
        assert_eq!(tokenize("bears"), vec!["bear"]);
    }

    #[test]
    fn deterministic_across_calls() {
        let a = tokenize("A Grizzly Bear's terrifying attack");
        let b = tokenize("A Grizzly Bear's terrifying attack");
        assert_eq!(a, b);
    }
}
