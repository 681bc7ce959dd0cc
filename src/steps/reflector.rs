//! Completeness-assessment step.
//!
//! Summarizes coverage per section, asks the evaluator backend for a 0-10
//! score and a completeness flag, and folds the iteration cap into the
//! decision. The cap is the only termination guarantee independent of model
//! output: at or past it, research is marked complete regardless of the
//! score, and a malformed reply never claims completeness on its own.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::{Step, StepError};
use crate::llm::{ChatMessage, TextGenerator};
use crate::parse;
use crate::prompts;
use crate::state::{ResearchState, ResearchUpdate};

const FALLBACK_SCORE: f64 = 5.0;
const COMPLETE_SCORE_THRESHOLD: f64 = 8.0;

/// Scores research completeness and decides whether it is done.
pub struct QualityReflector {
    generator: Arc<dyn TextGenerator>,
    max_iterations: u32,
}

impl QualityReflector {
    pub fn new(generator: Arc<dyn TextGenerator>, max_iterations: u32) -> Self {
        Self {
            generator,
            max_iterations,
        }
    }

    fn status_summary(state: &ResearchState) -> String {
        let mut status = format!("Research Query: {}\n\n", state.query);
        status.push_str(&format!(
            "Sections to cover: {}\n\n",
            state.sections.join(", ")
        ));
        status.push_str("Current Research Status:\n");

        for section in &state.sections {
            let count = state.summaries_for(section);
            if count > 0 {
                status.push_str(&format!("- {section}: {count} summaries collected\n"));
            } else {
                status.push_str(&format!("- {section}: Not yet researched\n"));
            }
        }

        status
    }
}

#[derive(Debug, Deserialize)]
struct ReflectionReply {
    #[serde(default = "default_score")]
    score: f64,
    #[serde(default = "default_feedback")]
    feedback: String,
    #[serde(default)]
    is_complete: Option<bool>,
}

fn default_score() -> f64 {
    FALLBACK_SCORE
}

fn default_feedback() -> String {
    "No feedback provided".to_string()
}

#[async_trait]
impl Step<ResearchState> for QualityReflector {
    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate, StepError> {
        let status = Self::status_summary(state);
        let messages = [
            ChatMessage::system(prompts::REFLECTOR_SYSTEM),
            ChatMessage::user(prompts::reflect(&status)),
        ];

        let reply = self
            .generator
            .generate(&messages)
            .await
            .map_err(|e| StepError::caused_by("reflection call failed", e))?;

        let at_limit = state.iteration_count >= self.max_iterations;

        let (score, feedback, complete) = match parse::decode_reply::<ReflectionReply>(&reply) {
            Some(parsed) => {
                let score = parsed.score.clamp(0.0, 10.0);
                let is_complete = parsed
                    .is_complete
                    .unwrap_or(score >= COMPLETE_SCORE_THRESHOLD);
                (score, parsed.feedback, is_complete || at_limit)
            }
            None => {
                warn!("reflection reply had no usable structure, using fallback assessment");
                (
                    FALLBACK_SCORE,
                    "Unable to parse reflection".to_string(),
                    at_limit,
                )
            }
        };

        info!(
            score,
            complete,
            iteration = state.iteration_count,
            "research assessed"
        );

        Ok(ResearchUpdate {
            confidence_score: Some(score / 10.0),
            reflection_feedback: Some(feedback),
            research_complete: Some(complete),
            new_messages: vec![ChatMessage::assistant(reply)],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{SectionResult, WorkflowState};
    use crate::steps::support::ScriptedGenerator;

    fn state_with_results() -> ResearchState {
        let mut state = ResearchState::new("topic");
        state.sections = vec!["A".into(), "B".into()];
        state.results_by_section.insert(
            "A".into(),
            vec![SectionResult {
                query: "q1".into(),
                summary: "s1".into(),
                raw_results: vec![],
            }],
        );
        state
    }

    fn reflector(reply: &'static str, max_iterations: u32) -> QualityReflector {
        QualityReflector::new(Arc::new(ScriptedGenerator::new([reply])), max_iterations)
    }

    #[tokio::test]
    async fn test_parsed_reply_sets_assessment() {
        let step = reflector(
            r#"{"score": 9, "feedback": "solid coverage", "is_complete": true}"#,
            10,
        );
        let state = state_with_results();

        let update = step.run(&state).await.unwrap();
        let state = state.apply_update(update);

        assert_eq!(state.confidence_score, Some(0.9));
        assert_eq!(state.reflection_feedback.as_deref(), Some("solid coverage"));
        assert!(state.research_complete);
    }

    #[tokio::test]
    async fn test_incomplete_below_threshold() {
        let step = reflector(r#"{"score": 4, "feedback": "thin", "is_complete": false}"#, 10);
        let state = state_with_results();

        let update = step.run(&state).await.unwrap();
        let state = state.apply_update(update);

        assert_eq!(state.confidence_score, Some(0.4));
        assert!(!state.research_complete);
    }

    #[tokio::test]
    async fn test_missing_flag_defaults_from_score() {
        let step = reflector(r#"{"score": 8, "feedback": "good"}"#, 10);
        let state = state_with_results();

        let update = step.run(&state).await.unwrap();
        let state = state.apply_update(update);

        assert!(state.research_complete);
    }

    #[tokio::test]
    async fn test_iteration_cap_forces_completion() {
        let step = reflector(r#"{"score": 3, "feedback": "weak", "is_complete": false}"#, 10);

        let mut state = state_with_results();
        state.iteration_count = 10;

        let update = step.run(&state).await.unwrap();
        let state = state.apply_update(update);

        // Complete despite the low score.
        assert!(state.research_complete);
        assert_eq!(state.confidence_score, Some(0.3));
    }

    #[tokio::test]
    async fn test_fallback_on_unparseable_reply() {
        let step = reflector("the research looks... fine?", 10);
        let state = state_with_results();

        let update = step.run(&state).await.unwrap();
        let state = state.apply_update(update);

        assert_eq!(state.confidence_score, Some(0.5));
        assert_eq!(
            state.reflection_feedback.as_deref(),
            Some("Unable to parse reflection")
        );
        // A parse failure never claims completeness under the cap.
        assert!(!state.research_complete);
    }

    #[tokio::test]
    async fn test_fallback_at_cap_still_completes() {
        let step = reflector("garbage", 2);

        let mut state = state_with_results();
        state.iteration_count = 2;

        let update = step.run(&state).await.unwrap();
        let state = state.apply_update(update);

        assert!(state.research_complete);
    }

    #[tokio::test]
    async fn test_out_of_range_score_clamped() {
        let step = reflector(r#"{"score": 15, "feedback": "over-eager"}"#, 10);
        let state = state_with_results();

        let update = step.run(&state).await.unwrap();
        let state = state.apply_update(update);

        assert_eq!(state.confidence_score, Some(1.0));
    }

    #[test]
    fn test_status_summary_counts_sections() {
        let state = state_with_results();
        let status = QualityReflector::status_summary(&state);

        assert!(status.contains("Research Query: topic"));
        assert!(status.contains("- A: 1 summaries collected"));
        assert!(status.contains("- B: Not yet researched"));
    }
}
