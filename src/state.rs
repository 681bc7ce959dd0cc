//! Research state aggregate and typed partial updates.
//!
//! The state is owned by the workflow engine for the duration of a run and
//! mutated only by applying step outputs. A step's output is a
//! [`ResearchUpdate`] carrying just the fields it touched: replace-fields are
//! `Option`, append-fields are plain collections. `apply_update` enforces the
//! aggregate's invariants: `message_log`, `sources`, and `results_by_section`
//! only ever grow, `research_complete` never transitions back to false, and
//! `confidence_score` stays within [0, 1].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::llm::ChatMessage;
use crate::search::SearchHit;

/// Source snippets are capped on entry.
pub const SOURCE_CONTENT_CHARS: usize = 500;

/// Truncate to a character count without splitting a code point.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// A collected source: url, title, and a capped content snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub url: String,
    pub title: String,
    pub content: String,
}

impl SourceRecord {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        content: impl AsRef<str>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: truncate_chars(content.as_ref(), SOURCE_CONTENT_CHARS),
        }
    }
}

/// One search query's outcome under its owning section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionResult {
    pub query: String,
    pub summary: String,
    /// Capped sample of the raw hits backing the summary.
    pub raw_results: Vec<SearchHit>,
}

/// The complete research state for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchState {
    /// Original research topic. Immutable after creation.
    pub query: String,

    /// Topic breakdown produced by the planner.
    pub sections: Vec<String>,

    /// Planned search queries; index `i` is owned by `sections[i]` when in
    /// range, else by a synthesized "Section i+1" label.
    pub search_queries: Vec<String>,

    /// Collected results grouped by section name; entries appear lazily on
    /// first result and are append-only within a section.
    pub results_by_section: HashMap<String, Vec<SectionResult>>,

    /// Every hit seen during research, in collection order. Unbounded here;
    /// the report lists only the first ten.
    pub sources: Vec<SourceRecord>,

    /// Completed researcher invocations. Monotonic.
    pub iteration_count: u32,

    /// Normalized self-assessed completeness, set by the reflector.
    pub confidence_score: Option<f64>,

    /// Latches true; no step can clear it.
    pub research_complete: bool,

    pub reflection_feedback: Option<String>,

    /// Final report, set by the synthesizer.
    pub report_draft: String,

    /// Conversation log across all model calls. Append-only, never reordered.
    pub message_log: Vec<ChatMessage>,
}

impl ResearchState {
    /// Fresh state for a research topic, everything else at zero defaults.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Owning section for the query at `index`.
    pub fn section_for(&self, index: usize) -> String {
        self.sections
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Section {}", index + 1))
    }

    /// Number of summaries collected under `section`.
    pub fn summaries_for(&self, section: &str) -> usize {
        self.results_by_section
            .get(section)
            .map_or(0, |results| results.len())
    }
}

/// Update type produced by workflow steps.
pub trait StateUpdate: Clone + Send + Sync + 'static {
    fn empty() -> Self;
    fn is_empty(&self) -> bool;
}

/// Shared state driven by the workflow engine.
///
/// `apply_update` is pure: the prior state is never modified in place, so a
/// failed step leaves nothing half-applied. `merge_updates` combines the
/// outputs of concurrent work inside a single step and must be
/// order-independent for appends.
pub trait WorkflowState: Clone + Send + Sync + 'static {
    type Update: StateUpdate;

    /// Apply an update to produce a new state.
    fn apply_update(&self, update: Self::Update) -> Self;

    /// Merge multiple updates into one.
    fn merge_updates(updates: Vec<Self::Update>) -> Self::Update;

    /// Whether the workflow should stop regardless of remaining edges.
    fn is_terminal(&self) -> bool {
        false
    }
}

/// Typed partial update produced by a single step.
///
/// Replace-fields (`Option`) overwrite their target when present;
/// append-fields extend theirs. Steps fill in only what they changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchUpdate {
    pub search_queries: Option<Vec<String>>,
    pub sections: Option<Vec<String>>,

    /// `(section, result)` pairs appended under their sections.
    pub new_results: Vec<(String, SectionResult)>,
    pub new_sources: Vec<SourceRecord>,
    pub new_messages: Vec<ChatMessage>,

    /// Added to `iteration_count`.
    pub iterations: u32,

    pub confidence_score: Option<f64>,
    pub reflection_feedback: Option<String>,

    /// `Some(true)` latches the flag; `Some(false)` cannot clear it.
    pub research_complete: Option<bool>,

    pub report_draft: Option<String>,
}

impl StateUpdate for ResearchUpdate {
    fn empty() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.search_queries.is_none()
            && self.sections.is_none()
            && self.new_results.is_empty()
            && self.new_sources.is_empty()
            && self.new_messages.is_empty()
            && self.iterations == 0
            && self.confidence_score.is_none()
            && self.reflection_feedback.is_none()
            && self.research_complete.is_none()
            && self.report_draft.is_none()
    }
}

impl WorkflowState for ResearchState {
    type Update = ResearchUpdate;

    fn apply_update(&self, update: ResearchUpdate) -> Self {
        let mut next = self.clone();

        if let Some(queries) = update.search_queries {
            next.search_queries = queries;
        }
        if let Some(sections) = update.sections {
            next.sections = sections;
        }

        for (section, result) in update.new_results {
            next.results_by_section
                .entry(section)
                .or_default()
                .push(result);
        }
        next.sources.extend(update.new_sources);
        next.message_log.extend(update.new_messages);

        next.iteration_count += update.iterations;

        if let Some(score) = update.confidence_score {
            next.confidence_score = Some(score.clamp(0.0, 1.0));
        }
        if let Some(feedback) = update.reflection_feedback {
            next.reflection_feedback = Some(feedback);
        }
        if update.research_complete == Some(true) {
            next.research_complete = true;
        }
        if let Some(draft) = update.report_draft {
            next.report_draft = draft;
        }

        next
    }

    fn merge_updates(updates: Vec<ResearchUpdate>) -> ResearchUpdate {
        let mut merged = ResearchUpdate::default();

        for update in updates {
            merged.new_results.extend(update.new_results);
            merged.new_sources.extend(update.new_sources);
            merged.new_messages.extend(update.new_messages);
            merged.iterations += update.iterations;

            if update.search_queries.is_some() {
                merged.search_queries = update.search_queries;
            }
            if update.sections.is_some() {
                merged.sections = update.sections;
            }
            if update.confidence_score.is_some() {
                merged.confidence_score = update.confidence_score;
            }
            if update.reflection_feedback.is_some() {
                merged.reflection_feedback = update.reflection_feedback;
            }
            if update.report_draft.is_some() {
                merged.report_draft = update.report_draft;
            }
            // Any true wins, so the latch survives merge order.
            if update.research_complete == Some(true) || merged.research_complete == Some(true) {
                merged.research_complete = Some(true);
            } else if update.research_complete.is_some() {
                merged.research_complete = update.research_complete;
            }
        }

        merged
    }

    fn is_terminal(&self) -> bool {
        self.research_complete && !self.report_draft.is_empty()
    }
}
