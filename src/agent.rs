//! Research agent assembly and entry point.
//!
//! Wires the four steps and the routing policy into the workflow graph:
//!
//! ```text
//! plan_queries ──▶ research_sections ──▶ reflect ──┬──▶ write_report ──▶ END
//!                        ▲                         │
//!                        └───────── continue ──────┘
//! ```
//!
//! Both reflect branches are part of the topology; [`ReflectPolicy`] decides
//! which one a run actually takes.

use std::sync::Arc;
use tracing::info;

use crate::checkpoint::Checkpointer;
use crate::config::AgentConfig;
use crate::engine::{Workflow, WorkflowBuilder, END};
use crate::error::AgentError;
use crate::llm::TextGenerator;
use crate::search::SearchProvider;
use crate::state::ResearchState;
use crate::steps::{QualityReflector, QueryPlanner, ReportSynthesizer, SectionResearcher};

pub const PLAN_QUERIES: &str = "plan_queries";
pub const RESEARCH_SECTIONS: &str = "research_sections";
pub const REFLECT: &str = "reflect";
pub const WRITE_REPORT: &str = "write_report";

/// Tagged routing decision taken after a reflection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Loop back for another research pass.
    Continue,
    /// Move on to report synthesis.
    Finalize,
}

impl RouteDecision {
    pub fn label(self) -> &'static str {
        match self {
            RouteDecision::Continue => "continue",
            RouteDecision::Finalize => "finalize",
        }
    }
}

/// Policy behind the reflect router.
///
/// `AlwaysFinalize` reproduces the observed behavior of going straight to
/// the report after one reflection; `LoopUntilComplete` takes the loop-back
/// edge while research is not complete. Switching policy changes no
/// topology, only which declared branch gets selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReflectPolicy {
    #[default]
    AlwaysFinalize,
    LoopUntilComplete,
}

impl ReflectPolicy {
    /// Decide where to go after a reflection pass.
    pub fn decide(self, state: &ResearchState) -> RouteDecision {
        match self {
            ReflectPolicy::AlwaysFinalize => RouteDecision::Finalize,
            ReflectPolicy::LoopUntilComplete => {
                if state.research_complete {
                    RouteDecision::Finalize
                } else {
                    RouteDecision::Continue
                }
            }
        }
    }
}

/// Builder wiring collaborators, config, and policy into an agent.
pub struct ResearchAgentBuilder {
    generator: Arc<dyn TextGenerator>,
    search: Arc<dyn SearchProvider>,
    config: AgentConfig,
    checkpointer: Option<Arc<dyn Checkpointer<ResearchState>>>,
    policy: ReflectPolicy,
}

impl ResearchAgentBuilder {
    pub fn new(generator: Arc<dyn TextGenerator>, search: Arc<dyn SearchProvider>) -> Self {
        Self {
            generator,
            search,
            config: AgentConfig::default(),
            checkpointer: None,
            policy: ReflectPolicy::default(),
        }
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn checkpointer(mut self, store: Arc<dyn Checkpointer<ResearchState>>) -> Self {
        self.checkpointer = Some(store);
        self
    }

    pub fn reflect_policy(mut self, policy: ReflectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<ResearchAgent, AgentError> {
        let planner = QueryPlanner::new(self.generator.clone());
        let researcher = SectionResearcher::new(self.generator.clone(), self.search.clone())
            .with_max_results(self.config.search_max_results)
            .with_depth(self.config.search_depth)
            .with_concurrency(self.config.search_concurrency);
        let reflector =
            QualityReflector::new(self.generator.clone(), self.config.max_iterations);
        let synthesizer = ReportSynthesizer::new(self.generator.clone());

        let policy = self.policy;
        let mut builder = WorkflowBuilder::new()
            .name("deep_research")
            .step(PLAN_QUERIES, planner)
            .step(RESEARCH_SECTIONS, researcher)
            .step(REFLECT, reflector)
            .step(WRITE_REPORT, synthesizer)
            .entry(PLAN_QUERIES)
            .edge(PLAN_QUERIES, RESEARCH_SECTIONS)
            .edge(RESEARCH_SECTIONS, REFLECT)
            .conditional_edge(
                REFLECT,
                move |state: &ResearchState| policy.decide(state).label().to_string(),
                vec![
                    (RouteDecision::Continue.label(), RESEARCH_SECTIONS),
                    (RouteDecision::Finalize.label(), WRITE_REPORT),
                ],
            )
            .edge(WRITE_REPORT, END);

        if let Some(store) = &self.checkpointer {
            builder = builder.checkpointer(store.clone());
        }

        let workflow = builder.build()?;

        Ok(ResearchAgent {
            workflow,
            checkpointer: self.checkpointer,
        })
    }
}

/// The assembled research agent.
pub struct ResearchAgent {
    workflow: Workflow<ResearchState>,
    checkpointer: Option<Arc<dyn Checkpointer<ResearchState>>>,
}

impl ResearchAgent {
    pub fn builder(
        generator: Arc<dyn TextGenerator>,
        search: Arc<dyn SearchProvider>,
    ) -> ResearchAgentBuilder {
        ResearchAgentBuilder::new(generator, search)
    }

    /// Run a research session to its terminal state.
    ///
    /// When a checkpoint store is configured and already holds `session_id`,
    /// the saved state is resumed instead of starting fresh.
    pub async fn run(&self, query: &str, session_id: &str) -> Result<ResearchState, AgentError> {
        let initial = match &self.checkpointer {
            Some(store) => match store.load(session_id).await? {
                Some(saved) => {
                    info!(%session_id, "resuming session from checkpoint");
                    saved
                }
                None => ResearchState::new(query),
            },
            None => ResearchState::new(query),
        };

        info!(%session_id, %query, "starting research run");
        let state = self.workflow.execute(session_id, initial).await?;
        Ok(state)
    }

    /// Run under a freshly generated session id.
    pub async fn run_new_session(&self, query: &str) -> Result<ResearchState, AgentError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.run(query, &session_id).await
    }
}
