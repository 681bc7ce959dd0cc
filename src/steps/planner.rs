//! Topic decomposition step.
//!
//! Asks the generation backend to break the research topic into search
//! queries and section labels. A reply without usable structure falls back
//! to a deterministic breakdown; that is a defined recovery path, not an
//! error. The step is idempotent: once sections exist it does nothing.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::{Step, StepError};
use crate::llm::{ChatMessage, TextGenerator};
use crate::parse;
use crate::prompts;
use crate::state::{ResearchState, ResearchUpdate};

const FALLBACK_SECTIONS: [&str; 3] = ["Overview", "Details", "Conclusion"];

/// Decomposes the research topic into queries and sections.
pub struct QueryPlanner {
    generator: Arc<dyn TextGenerator>,
}

impl QueryPlanner {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Deterministic recovery when the reply has no usable structure.
    fn fallback(query: &str) -> (Vec<String>, Vec<String>) {
        (
            vec![query.to_string()],
            FALLBACK_SECTIONS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct PlannerReply {
    #[serde(default)]
    queries: Vec<String>,
    #[serde(default)]
    sections: Vec<String>,
}

#[async_trait]
impl Step<ResearchState> for QueryPlanner {
    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate, StepError> {
        if !state.sections.is_empty() {
            debug!("sections already planned, skipping");
            return Ok(ResearchUpdate::default());
        }

        let messages = [
            ChatMessage::system(prompts::PLANNER_SYSTEM),
            ChatMessage::user(prompts::plan(&state.query)),
        ];

        let reply = self
            .generator
            .generate(&messages)
            .await
            .map_err(|e| StepError::caused_by("query planning call failed", e))?;

        // An empty list in an otherwise well-formed reply is as unusable as
        // prose, so both take the fallback.
        let (queries, sections) = match parse::decode_reply::<PlannerReply>(&reply) {
            Some(parsed) if !parsed.queries.is_empty() && !parsed.sections.is_empty() => {
                (parsed.queries, parsed.sections)
            }
            _ => {
                warn!("planner reply had no usable structure, using fallback breakdown");
                Self::fallback(&state.query)
            }
        };

        info!(
            queries = queries.len(),
            sections = sections.len(),
            "planned research breakdown"
        );

        Ok(ResearchUpdate {
            search_queries: Some(queries),
            sections: Some(sections),
            new_messages: vec![ChatMessage::assistant(reply)],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StateUpdate, WorkflowState};
    use crate::steps::support::{FailingGenerator, ScriptedGenerator};

    #[tokio::test]
    async fn test_well_formed_reply_sets_both_lists() {
        let generator = Arc::new(ScriptedGenerator::new([
            r#"```json
{"queries": ["q1", "q2", "q3"], "sections": ["A", "B", "C"]}
```"#,
        ]));
        let planner = QueryPlanner::new(generator);
        let state = ResearchState::new("topic X");

        let update = planner.run(&state).await.unwrap();
        let state = state.apply_update(update);

        assert_eq!(state.search_queries, vec!["q1", "q2", "q3"]);
        assert_eq!(state.sections, vec!["A", "B", "C"]);
        assert_eq!(state.message_log.len(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back() {
        let generator = Arc::new(ScriptedGenerator::new([
            "I am sorry, I cannot produce JSON today.",
        ]));
        let planner = QueryPlanner::new(generator);
        let state = ResearchState::new("topic X");

        let update = planner.run(&state).await.unwrap();
        let state = state.apply_update(update);

        assert_eq!(state.search_queries, vec!["topic X"]);
        assert_eq!(state.sections, vec!["Overview", "Details", "Conclusion"]);
        // The raw reply is still logged.
        assert_eq!(state.message_log.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_lists_fall_back() {
        let generator = Arc::new(ScriptedGenerator::new([
            r#"{"queries": [], "sections": []}"#,
        ]));
        let planner = QueryPlanner::new(generator);
        let state = ResearchState::new("topic X");

        let update = planner.run(&state).await.unwrap();
        let state = state.apply_update(update);

        assert!(!state.search_queries.is_empty());
        assert!(!state.sections.is_empty());
    }

    #[tokio::test]
    async fn test_idempotent_when_sections_exist() {
        let generator = Arc::new(ScriptedGenerator::new([]));
        let planner = QueryPlanner::new(generator);

        let mut state = ResearchState::new("topic X");
        state.sections = vec!["A".into()];
        state.search_queries = vec!["q".into()];

        let update = planner.run(&state).await.unwrap();
        assert!(update.is_empty());

        // Twice in a row, same answer.
        let update = planner.run(&state).await.unwrap();
        assert!(update.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_as_step_error() {
        let planner = QueryPlanner::new(Arc::new(FailingGenerator));
        let state = ResearchState::new("topic X");

        let err = planner.run(&state).await.unwrap_err();
        assert!(err.to_string().contains("query planning call failed"));
    }
}
