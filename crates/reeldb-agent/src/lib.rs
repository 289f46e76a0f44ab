#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod enhance;
pub mod merge;
pub mod orchestrator;
pub mod planner;
pub mod tools;

pub use enhance::{EnhanceMethod, QueryEnhancer};
pub use merge::{IntersectionMode, MergedMovie};
pub use orchestrator::{AgenticConfig, AgenticOutcome, AgenticSearch, SearchRecord};
pub use planner::{PlanDecision, Planner};
pub use tools::{
    ActorSearchTool, GenreSearchTool, HybridSearchTool, KeywordSearchTool, PatternSearchTool,
    SearchTool, SemanticSearchTool, ToolKind,
};
