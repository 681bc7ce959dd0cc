//! Integration tests driving the full research workflow with scripted
//! backends: planner fallback behavior, iteration-cap termination, routing
//! after reflection under both policies, and report/source discipline.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use deep_research::{
    prompts, AgentConfig, ChatMessage, Checkpointer, LlmError, MemoryCheckpointer, ReflectPolicy,
    ResearchAgent, ResearchAgentBuilder, ResearchState, SearchDepth, SearchError, SearchHit,
    SearchProvider, TextGenerator,
};

/// Routes replies by the system instruction of each call, so concurrent
/// summarize calls and repeated reflection rounds stay deterministic.
struct RoutedGenerator {
    plan: String,
    summary: String,
    reflections: Mutex<VecDeque<String>>,
    report: String,
}

impl RoutedGenerator {
    fn new(plan: &str, reflection: &str) -> Self {
        Self::with_reflections(plan, vec![reflection])
    }

    fn with_reflections(plan: &str, reflections: Vec<&str>) -> Self {
        Self {
            plan: plan.to_string(),
            summary: "a concise summary of the findings".to_string(),
            reflections: Mutex::new(reflections.into_iter().map(String::from).collect()),
            report: "An executive summary, findings, and conclusions.".to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for RoutedGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let system = messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        if system == prompts::PLANNER_SYSTEM {
            Ok(self.plan.clone())
        } else if system == prompts::SUMMARIZER_SYSTEM {
            Ok(self.summary.clone())
        } else if system == prompts::REFLECTOR_SYSTEM {
            let mut reflections = self.reflections.lock().unwrap();
            if reflections.len() > 1 {
                Ok(reflections.pop_front().unwrap())
            } else {
                // Last reflection repeats.
                reflections
                    .front()
                    .cloned()
                    .ok_or(LlmError::EmptyResponse)
            }
        } else if system == prompts::REPORT_SYSTEM {
            Ok(self.report.clone())
        } else {
            Err(LlmError::Malformed(format!("unexpected system prompt: {system}")))
        }
    }

    fn name(&self) -> &str {
        "routed"
    }
}

struct CannedSearch {
    hits: Vec<SearchHit>,
}

#[async_trait]
impl SearchProvider for CannedSearch {
    async fn search(
        &self,
        _query: &str,
        max_results: u32,
        _depth: SearchDepth,
    ) -> Result<Vec<SearchHit>, SearchError> {
        Ok(self
            .hits
            .iter()
            .take(max_results as usize)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "canned"
    }
}

fn hits(n: usize) -> Vec<SearchHit> {
    (0..n)
        .map(|i| {
            SearchHit::new(
                format!("https://example.com/{i}"),
                format!("Result {i}"),
                format!("content of result {i}"),
            )
        })
        .collect()
}

const THREE_PART_PLAN: &str = r#"```json
{
    "queries": ["q one", "q two", "q three"],
    "sections": ["Background", "Current State", "Outlook"]
}
```"#;

const COMPLETE_REFLECTION: &str =
    r#"{"score": 9, "feedback": "well covered", "is_complete": true}"#;

const WEAK_REFLECTION: &str =
    r#"{"score": 3, "feedback": "needs more depth", "is_complete": false}"#;

fn agent(generator: RoutedGenerator, search_hits: usize) -> ResearchAgent {
    ResearchAgentBuilder::new(
        Arc::new(generator),
        Arc::new(CannedSearch {
            hits: hits(search_hits),
        }),
    )
    .build()
    .unwrap()
}

#[tokio::test]
async fn well_formed_plan_populates_all_three_sections() {
    let agent = agent(RoutedGenerator::new(THREE_PART_PLAN, COMPLETE_REFLECTION), 2);

    let state = agent.run("topic X", "s1").await.unwrap();

    assert_eq!(state.sections.len(), 3);
    assert_eq!(state.search_queries.len(), 3);
    assert_eq!(state.iteration_count, 1);
    for section in ["Background", "Current State", "Outlook"] {
        assert_eq!(state.summaries_for(section), 1, "section {section}");
    }
    // Three queries times two hits each.
    assert_eq!(state.sources.len(), 6);
    assert_eq!(state.confidence_score, Some(0.9));
    assert!(state.research_complete);

    // Planner + three summaries + reflection + report.
    assert_eq!(state.message_log.len(), 6);
}

#[tokio::test]
async fn unparseable_plan_falls_back_deterministically() {
    let agent = agent(
        RoutedGenerator::new("no structure here, just prose", COMPLETE_REFLECTION),
        1,
    );

    let state = agent.run("topic X", "s2").await.unwrap();

    assert_eq!(state.search_queries, vec!["topic X"]);
    assert_eq!(state.sections, vec!["Overview", "Details", "Conclusion"]);
    // The single fallback query landed under the first section.
    assert_eq!(state.summaries_for("Overview"), 1);
    assert!(!state.report_draft.is_empty());
}

#[tokio::test]
async fn iteration_cap_completes_despite_low_score() {
    let store = Arc::new(MemoryCheckpointer::<ResearchState>::new());

    // A session that has already been through nine research passes.
    let mut seeded = ResearchState::new("topic X");
    seeded.sections = vec!["Overview".into()];
    seeded.search_queries = vec!["q1".into()];
    seeded.iteration_count = 9;
    store.save("long-session", &seeded).await.unwrap();

    let agent = ResearchAgentBuilder::new(
        Arc::new(RoutedGenerator::new(THREE_PART_PLAN, WEAK_REFLECTION)),
        Arc::new(CannedSearch { hits: hits(1) }),
    )
    .checkpointer(store.clone())
    .build()
    .unwrap();

    let state = agent.run("topic X", "long-session").await.unwrap();

    // Resumed, so the planner was a no-op and the tenth pass hit the cap.
    assert_eq!(state.sections, vec!["Overview"]);
    assert_eq!(state.iteration_count, 10);
    assert!(state.research_complete);
    assert_eq!(state.confidence_score, Some(0.3));

    // The terminal state is what the store now holds.
    let saved = store.load("long-session").await.unwrap().unwrap();
    assert_eq!(saved.iteration_count, 10);
    assert!(!saved.report_draft.is_empty());
}

#[tokio::test]
async fn complete_reflection_routes_to_report_not_back() {
    let agent = ResearchAgentBuilder::new(
        Arc::new(RoutedGenerator::new(THREE_PART_PLAN, COMPLETE_REFLECTION)),
        Arc::new(CannedSearch { hits: hits(1) }),
    )
    .reflect_policy(ReflectPolicy::LoopUntilComplete)
    .build()
    .unwrap();

    let state = agent.run("topic X", "s4").await.unwrap();

    // One research pass, then straight to the report.
    assert_eq!(state.iteration_count, 1);
    assert!(!state.report_draft.is_empty());
    assert!(state.research_complete);
}

#[tokio::test]
async fn loop_back_edge_researches_until_cap() {
    let mut config = AgentConfig::default();
    config.max_iterations = 3;

    let agent = ResearchAgentBuilder::new(
        Arc::new(RoutedGenerator::new(THREE_PART_PLAN, WEAK_REFLECTION)),
        Arc::new(CannedSearch { hits: hits(1) }),
    )
    .config(config)
    .reflect_policy(ReflectPolicy::LoopUntilComplete)
    .build()
    .unwrap();

    let state = agent.run("topic X", "s5").await.unwrap();

    // Weak reflections loop research until the cap forces completion.
    assert_eq!(state.iteration_count, 3);
    assert!(state.research_complete);
    assert!(!state.report_draft.is_empty());
    // Three summaries accumulated per section across the passes.
    assert_eq!(state.summaries_for("Background"), 3);
}

#[tokio::test]
async fn empty_search_results_produce_no_sources_block() {
    let agent = agent(RoutedGenerator::new(THREE_PART_PLAN, COMPLETE_REFLECTION), 0);

    let state = agent.run("topic X", "s6").await.unwrap();

    assert!(state.sources.is_empty());
    assert!(!state.report_draft.is_empty());
    assert!(!state.report_draft.contains("## Sources"));
}

#[tokio::test]
async fn sources_block_lists_first_ten_in_insertion_order() {
    // One query keeps source order deterministic.
    const SINGLE_PLAN: &str = r#"{"queries": ["only query"], "sections": ["Only"]}"#;

    let agent = agent(RoutedGenerator::new(SINGLE_PLAN, COMPLETE_REFLECTION), 12);

    let state = agent.run("topic X", "s7").await.unwrap();

    assert_eq!(state.sources.len(), 5); // capped by search_max_results
    assert!(state.report_draft.contains("## Sources"));
    assert!(state
        .report_draft
        .contains("1. [Result 0](https://example.com/0)"));
}

#[tokio::test]
async fn unparseable_reflection_never_claims_completeness_early() {
    let agent = agent(
        RoutedGenerator::with_reflections(THREE_PART_PLAN, vec!["hmm, looks ok to me"]),
        1,
    );

    let state = agent.run("topic X", "s8").await.unwrap();

    assert_eq!(state.confidence_score, Some(0.5));
    assert_eq!(
        state.reflection_feedback.as_deref(),
        Some("Unable to parse reflection")
    );
    // The default policy still finalizes, and the report step latches the flag.
    assert!(state.research_complete);
    assert!(!state.report_draft.is_empty());
}

#[tokio::test]
async fn message_log_accumulates_in_append_order() {
    let agent = agent(RoutedGenerator::new(THREE_PART_PLAN, COMPLETE_REFLECTION), 1);

    let state = agent.run("topic X", "s9").await.unwrap();

    // First entry is the planner reply, last is the report reply.
    assert_eq!(state.message_log.first().unwrap().content, THREE_PART_PLAN);
    assert_eq!(
        state.message_log.last().unwrap().content,
        "An executive summary, findings, and conclusions."
    );
}
