//! Sentence-window chunking for descriptions.
//!
//! Windows are contiguous with a fixed overlap: step = max_sentences −
//! overlap (at least 1), so every sentence is covered exactly once per
//! window it falls into.

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Sentences per chunk.
    pub max_sentences: usize,
    /// Sentences shared between consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_sentences: 8,
            overlap: 2,
        }
    }
}

/// Split text into sentences on `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev_was_terminator = false;
    for (i, c) in text.char_indices() {
        if prev_was_terminator && c.is_whitespace() {
            let sentence = text[start..i].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = i;
        }
        prev_was_terminator = matches!(c, '.' | '!' | '?');
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Group sentences into overlapping windows.
pub fn chunk_sentences(text: &str, config: ChunkingConfig) -> Vec<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }
    let step = if config.max_sentences > config.overlap {
        config.max_sentences - config.overlap
    } else {
        1
    };
    let mut chunks = Vec::new();
    let mut i = 0;
    while i < sentences.len() {
        let end = (i + config.max_sentences).min(sentences.len());
        chunks.push(sentences[i..end].join(" "));
        if end == sentences.len() {
            break;
        }
        i += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminators() {
        let s = split_sentences("One sentence. Another one! A third? Done");
        assert_eq!(s.len(), 4);
        assert_eq!(s[0], "One sentence.");
        assert_eq!(s[3], "Done");
    }

    #[test]
    fn windows_are_contiguous_with_overlap() {
        let text = "S1. S2. S3. S4. S5. S6.";
        let chunks = chunk_sentences(
            text,
            ChunkingConfig {
                max_sentences: 3,
                overlap: 1,
            },
        );
        assert_eq!(chunks, vec!["S1. S2. S3.", "S3. S4. S5.", "S5. S6."]);
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_sentences("Just one sentence.", ChunkingConfig::default());
        assert_eq!(chunks, vec!["Just one sentence."]);
    }

    #[test]
    fn degenerate_overlap_still_advances() {
        let chunks = chunk_sentences(
            "A. B. C.",
            ChunkingConfig {
                max_sentences: 2,
                overlap: 2,
            },
        );
        // Step clamps to 1 so the loop always makes progress.
        assert_eq!(chunks.len(), 2);
    }
}
