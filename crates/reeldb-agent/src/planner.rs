//! Iteration planning: ask the completion service which tool to run next,
//! with a local heuristic standing in whenever the service is unavailable or
//! unparseable.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use reeldb_core::jsonx::extract_json_object;
use reeldb_core::traits::{complete_bounded, CompletionClient, COMPLETION_TIMEOUT};
use reeldb_core::types::ScoredMovie;

use crate::orchestrator::SearchRecord;
use crate::tools::{SearchTool, ToolKind};

const HISTORY_SAMPLE_DOCS: usize = 3;
const SNIPPET_CHARS: usize = 160;
const POOL_SUMMARY_TOP: usize = 5;

/// What to do on the next iteration.
#[derive(Debug, Clone)]
pub enum PlanDecision {
    Run {
        tool: ToolKind,
        query: String,
        reasoning: String,
    },
    Stop,
}

#[derive(Deserialize)]
struct PlannerReply {
    #[serde(rename = "continue")]
    proceed: bool,
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

pub struct Planner {
    completions: Option<Arc<dyn CompletionClient>>,
}

impl Planner {
    pub fn new(completions: Option<Arc<dyn CompletionClient>>) -> Self {
        Self { completions }
    }

    /// Decide the next (tool, query) or stop. Never fails: planner trouble
    /// degrades to [`heuristic_plan`].
    pub async fn plan(
        &self,
        original_query: &str,
        tools: &[Arc<dyn SearchTool>],
        history: &[SearchRecord],
        pool_top: &[ScoredMovie],
        used: &HashSet<(ToolKind, String)>,
    ) -> PlanDecision {
        let Some(completions) = &self.completions else {
            return heuristic_plan(original_query, used);
        };

        let prompt = build_prompt(original_query, tools, history, pool_top, used);
        let reply = match complete_bounded(completions.as_ref(), &prompt, COMPLETION_TIMEOUT).await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "planner call failed, using heuristic");
                return heuristic_plan(original_query, used);
            }
        };

        match parse_reply(&reply) {
            Some(decision) => decision,
            None => {
                tracing::warn!("unparseable planner reply, using heuristic");
                heuristic_plan(original_query, used)
            }
        }
    }
}

fn parse_reply(reply: &str) -> Option<PlanDecision> {
    let value = extract_json_object(reply)?;
    let parsed: PlannerReply = serde_json::from_value(value).ok()?;
    if !parsed.proceed {
        return Some(PlanDecision::Stop);
    }
    let tool = ToolKind::parse(&parsed.tool?)?;
    let query = parsed.query.filter(|q| !q.trim().is_empty())?;
    Some(PlanDecision::Run {
        tool,
        query,
        reasoning: parsed.reasoning.unwrap_or_default(),
    })
}

/// Local fallback: the actor tool on an explicit cast cue, otherwise the
/// hybrid tool, otherwise stop. Each choice is used at most once.
pub fn heuristic_plan(query: &str, used: &HashSet<(ToolKind, String)>) -> PlanDecision {
    let lowered = query.to_lowercase();
    let cast_cue = lowered.contains(" with ") || lowered.contains("starring");
    if cast_cue && !used.contains(&(ToolKind::ActorSearch, query.to_string())) {
        return PlanDecision::Run {
            tool: ToolKind::ActorSearch,
            query: query.to_string(),
            reasoning: "query names people in the cast".to_string(),
        };
    }
    if !used.contains(&(ToolKind::HybridSearch, query.to_string())) {
        return PlanDecision::Run {
            tool: ToolKind::HybridSearch,
            query: query.to_string(),
            reasoning: "general-purpose fused search".to_string(),
        };
    }
    PlanDecision::Stop
}

fn build_prompt(
    original_query: &str,
    tools: &[Arc<dyn SearchTool>],
    history: &[SearchRecord],
    pool_top: &[ScoredMovie],
    used: &HashSet<(ToolKind, String)>,
) -> String {
    let mut tool_lines = String::new();
    for tool in tools {
        tool_lines.push_str(&format!("- {}: {}\n", tool.kind(), tool.description()));
    }

    let mut history_lines = String::new();
    for record in history {
        history_lines.push_str(&format!(
            "- tool={} query=\"{}\" results={}\n",
            record.tool,
            record.query,
            record.results.len()
        ));
        for movie in record.results.iter().take(HISTORY_SAMPLE_DOCS) {
            history_lines.push_str(&format!(
                "    {} ({:.2}): {}\n",
                movie.title,
                movie.score,
                snippet(&movie.description)
            ));
        }
    }
    if history_lines.is_empty() {
        history_lines.push_str("(none yet)\n");
    }

    let mut pool_lines = String::new();
    for movie in pool_top.iter().take(POOL_SUMMARY_TOP) {
        pool_lines.push_str(&format!("- {} ({:.2})\n", movie.title, movie.score));
    }
    if pool_lines.is_empty() {
        pool_lines.push_str("(empty)\n");
    }

    let used_json = json!(used
        .iter()
        .map(|(tool, query)| json!({"tool": tool, "query": query}))
        .collect::<Vec<_>>());

    format!(
        "You plan one step of a movie search.\n\
         Original query: \"{original_query}\"\n\n\
         Available tools:\n{tool_lines}\n\
         Searches so far:\n{history_lines}\n\
         Best candidates so far:\n{pool_lines}\n\
         Already tried (never repeat these): {used_json}\n\n\
         Reply with JSON only:\n\
         {{\"continue\": true|false, \"tool\": \"<tool name>\", \
         \"query\": \"<refined query>\", \"reasoning\": \"<why>\"}}\n\
         Set \"continue\" to false when the candidates already answer the query."
    )
}

fn snippet(text: &str) -> String {
    if text.chars().count() <= SNIPPET_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(SNIPPET_CHARS).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_clean_run_decision() {
        let reply = r#"{"continue": true, "tool": "genre_search", "query": "horror", "reasoning": "mood query"}"#;
        match parse_reply(reply) {
            Some(PlanDecision::Run { tool, query, .. }) => {
                assert_eq!(tool, ToolKind::GenreSearch);
                assert_eq!(query, "horror");
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn parses_stop_and_rejects_noise() {
        assert!(matches!(
            parse_reply(r#"{"continue": false}"#),
            Some(PlanDecision::Stop)
        ));
        assert!(parse_reply("not json at all").is_none());
        // Unknown tool names are rejected, forcing the heuristic.
        assert!(parse_reply(r#"{"continue": true, "tool": "ask_a_friend", "query": "x"}"#).is_none());
        assert!(parse_reply(r#"{"continue": true, "tool": "hybrid_search", "query": "  "}"#).is_none());
    }

    #[test]
    fn fenced_reply_still_parses() {
        let reply = "```json\n{\"continue\": true, \"tool\": \"actor_search\", \"query\": \"tom hanks\", \"reasoning\": \"cast\"}\n```";
        assert!(matches!(parse_reply(reply), Some(PlanDecision::Run { .. })));
    }

    #[test]
    fn heuristic_prefers_actor_tool_on_cast_cue() {
        let used = HashSet::new();
        match heuristic_plan("movies with tom hanks", &used) {
            PlanDecision::Run { tool, .. } => assert_eq!(tool, ToolKind::ActorSearch),
            PlanDecision::Stop => panic!("expected a run"),
        }
    }

    #[test]
    fn heuristic_falls_back_to_hybrid_then_stops() {
        let query = "space adventure";
        let mut used = HashSet::new();
        match heuristic_plan(query, &used) {
            PlanDecision::Run { tool, .. } => assert_eq!(tool, ToolKind::HybridSearch),
            PlanDecision::Stop => panic!("expected a run"),
        }
        used.insert((ToolKind::HybridSearch, query.to_string()));
        assert!(matches!(heuristic_plan(query, &used), PlanDecision::Stop));
    }
}
