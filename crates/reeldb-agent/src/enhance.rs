//! LLM-backed query preprocessing. Every method is best effort: any failure
//! or empty reply hands the original query back untouched.

use std::sync::Arc;

use reeldb_core::jsonx::normalize_llm_text;
use reeldb_core::traits::{complete_bounded, CompletionClient, COMPLETION_TIMEOUT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhanceMethod {
    /// Fix obvious typos, change nothing else.
    Spell,
    /// Rephrase for retrieval without changing intent.
    Rewrite,
    /// Append related terms to widen recall.
    Expand,
}

impl EnhanceMethod {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "spell" => Some(Self::Spell),
            "rewrite" => Some(Self::Rewrite),
            "expand" => Some(Self::Expand),
            _ => None,
        }
    }
}

pub struct QueryEnhancer {
    completions: Arc<dyn CompletionClient>,
}

impl QueryEnhancer {
    pub fn new(completions: Arc<dyn CompletionClient>) -> Self {
        Self { completions }
    }

    pub async fn enhance(&self, query: &str, method: EnhanceMethod) -> String {
        let instruction = match method {
            EnhanceMethod::Spell => {
                "Correct any spelling mistakes in this movie search query. \
                 Change nothing else. Reply with the corrected query only."
            }
            EnhanceMethod::Rewrite => {
                "Rewrite this movie search query to work better against a \
                 title-and-description index, keeping the same intent. Reply \
                 with the rewritten query only."
            }
            EnhanceMethod::Expand => {
                "Expand this movie search query with a few closely related \
                 terms to widen recall. Reply with the expanded query only."
            }
        };
        let prompt = format!("{instruction}\n\nQuery: {query}");
        match complete_bounded(self.completions.as_ref(), &prompt, COMPLETION_TIMEOUT).await {
            Ok(reply) => {
                let cleaned = normalize_llm_text(&reply);
                if cleaned.is_empty() || cleaned.lines().count() > 1 {
                    tracing::warn!(method = ?method, "unusable enhancement reply, keeping query");
                    query.to_string()
                } else {
                    cleaned
                }
            }
            Err(e) => {
                tracing::warn!(method = ?method, error = %e, "enhancement failed, keeping query");
                query.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(Option<String>);

    #[async_trait]
    impl CompletionClient for Fixed {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            match &self.0 {
                Some(reply) => Ok(reply.clone()),
                None => anyhow::bail!("service down"),
            }
        }
    }

    #[tokio::test]
    async fn failure_returns_the_original_query() {
        let enhancer = QueryEnhancer::new(Arc::new(Fixed(None)));
        assert_eq!(
            enhancer.enhance("scarry movise", EnhanceMethod::Spell).await,
            "scarry movise"
        );
    }

    #[tokio::test]
    async fn clean_reply_is_used_and_quotes_are_stripped() {
        let enhancer = QueryEnhancer::new(Arc::new(Fixed(Some("\"scary movies\"".to_string()))));
        assert_eq!(
            enhancer.enhance("scarry movise", EnhanceMethod::Spell).await,
            "scary movies"
        );
    }

    #[tokio::test]
    async fn multi_line_reply_is_rejected() {
        let reply = "Sure, here you go:\nscary movies".to_string();
        let enhancer = QueryEnhancer::new(Arc::new(Fixed(Some(reply))));
        assert_eq!(
            enhancer.enhance("scarry movise", EnhanceMethod::Spell).await,
            "scarry movise"
        );
    }

    #[test]
    fn method_names_parse() {
        assert_eq!(EnhanceMethod::parse("spell"), Some(EnhanceMethod::Spell));
        assert_eq!(EnhanceMethod::parse("REWRITE"), Some(EnhanceMethod::Rewrite));
        assert_eq!(EnhanceMethod::parse("expand "), Some(EnhanceMethod::Expand));
        assert_eq!(EnhanceMethod::parse("summarize"), None);
    }
}
