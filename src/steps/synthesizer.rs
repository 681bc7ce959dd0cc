//! Report synthesis step. Terminal: after it runs, the state stops moving.
//!
//! Renders the accumulated findings into a deterministic content block,
//! hands that to the generation backend for the narrative report, then
//! appends a deterministic source list. Sections render in planning order;
//! a section with no results gets a placeholder line.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::engine::{Step, StepError};
use crate::llm::{ChatMessage, TextGenerator};
use crate::prompts;
use crate::state::{ResearchState, ResearchUpdate, SourceRecord};

/// The report lists at most this many sources.
pub const MAX_REPORT_SOURCES: usize = 10;

/// Compiles the final report from the accumulated research state.
pub struct ReportSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl ReportSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Deterministic findings block fed to the report prompt.
    fn research_content(state: &ResearchState) -> String {
        let mut content = format!("# Research Report: {}\n\n", state.query);

        for section in &state.sections {
            content.push_str(&format!("## {section}\n\n"));

            match state.results_by_section.get(section) {
                Some(results) if !results.is_empty() => {
                    for result in results {
                        content.push_str(&result.summary);
                        content.push_str("\n\n");
                    }
                }
                _ => content.push_str("No research data available for this section.\n\n"),
            }
        }

        content
    }

    /// Numbered title + link list over the first ten sources.
    fn sources_block(sources: &[SourceRecord]) -> String {
        let mut block = String::from("\n\n## Sources\n\n");
        for (i, source) in sources.iter().take(MAX_REPORT_SOURCES).enumerate() {
            block.push_str(&format!("{}. [{}]({})\n", i + 1, source.title, source.url));
        }
        block
    }
}

#[async_trait]
impl Step<ResearchState> for ReportSynthesizer {
    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate, StepError> {
        let content = Self::research_content(state);
        let messages = [
            ChatMessage::system(prompts::REPORT_SYSTEM),
            ChatMessage::user(prompts::report(&state.query, &content)),
        ];

        let reply = self
            .generator
            .generate(&messages)
            .await
            .map_err(|e| StepError::caused_by("report synthesis call failed", e))?;

        let mut draft = reply.clone();
        if !state.sources.is_empty() {
            draft.push_str(&Self::sources_block(&state.sources));
        }

        info!(
            sections = state.sections.len(),
            listed_sources = state.sources.len().min(MAX_REPORT_SOURCES),
            "report synthesized"
        );

        Ok(ResearchUpdate {
            report_draft: Some(draft),
            research_complete: Some(true),
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

    fn result(query: &str, summary: &str) -> SectionResult {
        SectionResult {
            query: query.into(),
            summary: summary.into(),
            raw_results: vec![],
        }
    }

    fn researched_state() -> ResearchState {
        let mut state = ResearchState::new("topic");
        state.sections = vec!["A".into(), "B".into()];
        state.results_by_section.insert(
            "A".into(),
            vec![result("q1", "first finding"), result("q2", "second finding")],
        );
        state
    }

    fn synthesizer() -> ReportSynthesizer {
        ReportSynthesizer::new(Arc::new(ScriptedGenerator::new(["the narrative report"])))
    }

    #[test]
    fn test_content_renders_sections_in_order() {
        let state = researched_state();
        let content = ReportSynthesizer::research_content(&state);

        assert!(content.starts_with("# Research Report: topic\n\n"));
        let a = content.find("## A").unwrap();
        let b = content.find("## B").unwrap();
        assert!(a < b);
        // Summaries appear in insertion order.
        let first = content.find("first finding").unwrap();
        let second = content.find("second finding").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_content_placeholder_for_empty_section() {
        let state = researched_state();
        let content = ReportSynthesizer::research_content(&state);

        assert!(content.contains("No research data available for this section."));
    }

    #[tokio::test]
    async fn test_report_with_sources_lists_at_most_ten() {
        let mut state = researched_state();
        for i in 0..15 {
            state.sources.push(SourceRecord::new(
                format!("https://example.com/{i}"),
                format!("Source {i}"),
                "text",
            ));
        }

        let update = synthesizer().run(&state).await.unwrap();
        let state = state.apply_update(update);

        assert!(state.report_draft.contains("## Sources"));
        assert!(state.report_draft.contains("1. [Source 0](https://example.com/0)"));
        assert!(state.report_draft.contains("10. [Source 9](https://example.com/9)"));
        assert!(!state.report_draft.contains("Source 10"));
        assert!(state.research_complete);
    }

    #[tokio::test]
    async fn test_report_without_sources_has_no_sources_heading() {
        let state = researched_state();

        let update = synthesizer().run(&state).await.unwrap();
        let state = state.apply_update(update);

        assert!(state.report_draft.contains("the narrative report"));
        assert!(!state.report_draft.contains("## Sources"));
    }

    #[tokio::test]
    async fn test_reply_logged_without_sources_block() {
        let mut state = researched_state();
        state
            .sources
            .push(SourceRecord::new("https://a.com", "A", "text"));

        let update = synthesizer().run(&state).await.unwrap();
        let state = state.apply_update(update);

        // The log keeps the raw reply; the draft carries the source list.
        assert_eq!(
            state.message_log.last().unwrap().content,
            "the narrative report"
        );
        assert!(state.report_draft.contains("## Sources"));
    }
}
