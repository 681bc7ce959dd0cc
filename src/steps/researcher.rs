//! Evidence-gathering step.
//!
//! Fans the planned queries out to the search backend with bounded
//! concurrency. Each query is summarized strictly from its own hits, so the
//! fan-in merge can land per-query updates in any completion order without
//! mixing results across queries. One invocation counts as one research
//! iteration no matter how many queries it covers.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info};

use crate::engine::{Step, StepError};
use crate::llm::{ChatMessage, TextGenerator};
use crate::prompts;
use crate::search::{SearchDepth, SearchHit, SearchProvider};
use crate::state::{
    truncate_chars, ResearchState, ResearchUpdate, SectionResult, SourceRecord, WorkflowState,
};

/// How many raw hits are kept per query result.
pub const RAW_RESULT_SAMPLE: usize = 3;

/// Hit content is condensed to this many characters for the summary prompt.
const CONDENSED_CONTENT_CHARS: usize = 300;

const DEFAULT_MAX_RESULTS: u32 = 5;
const DEFAULT_CONCURRENCY: usize = 4;

/// Searches and summarizes every planned query under its owning section.
pub struct SectionResearcher {
    generator: Arc<dyn TextGenerator>,
    search: Arc<dyn SearchProvider>,
    max_results: u32,
    depth: SearchDepth,
    concurrency: usize,
}

impl SectionResearcher {
    pub fn new(generator: Arc<dyn TextGenerator>, search: Arc<dyn SearchProvider>) -> Self {
        Self {
            generator,
            search,
            max_results: DEFAULT_MAX_RESULTS,
            depth: SearchDepth::Advanced,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_depth(mut self, depth: SearchDepth) -> Self {
        self.depth = depth;
        self
    }

    /// Bound on concurrently researched queries.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Search one query and summarize its hits. Internally consistent: the
    /// summary is generated only from this query's own results.
    async fn research_query(
        &self,
        section: String,
        query: String,
    ) -> Result<ResearchUpdate, StepError> {
        debug!(%query, %section, "searching");

        let hits = self
            .search
            .search(&query, self.max_results, self.depth)
            .await
            .map_err(|e| StepError::caused_by(format!("search for '{query}' failed"), e))?;

        let new_sources = hits
            .iter()
            .map(|hit| SourceRecord::new(&hit.url, &hit.title, &hit.content))
            .collect();

        let sample: Vec<SearchHit> = hits.into_iter().take(RAW_RESULT_SAMPLE).collect();
        let condensed = sample
            .iter()
            .map(|hit| {
                format!(
                    "Title: {}\nContent: {}",
                    hit.title,
                    truncate_chars(&hit.content, CONDENSED_CONTENT_CHARS)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let messages = [
            ChatMessage::system(prompts::SUMMARIZER_SYSTEM),
            ChatMessage::user(prompts::summarize(&query, &condensed)),
        ];

        let summary = self
            .generator
            .generate(&messages)
            .await
            .map_err(|e| StepError::caused_by(format!("summarization for '{query}' failed"), e))?;

        Ok(ResearchUpdate {
            new_sources,
            new_messages: vec![ChatMessage::assistant(&summary)],
            new_results: vec![(
                section,
                SectionResult {
                    query,
                    summary,
                    raw_results: sample,
                },
            )],
            ..Default::default()
        })
    }
}

#[async_trait]
impl Step<ResearchState> for SectionResearcher {
    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate, StepError> {
        if state.search_queries.is_empty() {
            debug!("no search queries planned, skipping");
            return Ok(ResearchUpdate::default());
        }

        let tasks: Vec<_> = state
            .search_queries
            .iter()
            .enumerate()
            .map(|(index, query): (usize, &String)| {
                let section = state.section_for(index);
                let query = query.clone();
                async move { self.research_query(section, query).await }
            })
            .collect();

        let per_query: Vec<ResearchUpdate> = stream::iter(tasks)
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        info!(
            queries = per_query.len(),
            iteration = state.iteration_count + 1,
            "research pass complete"
        );

        let mut update = ResearchState::merge_updates(per_query);
        update.iterations = 1;
        Ok(update)
    }
}
