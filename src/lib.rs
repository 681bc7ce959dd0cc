//! Autonomous multi-step research over a small workflow engine.
//!
//! A run decomposes a topic into search queries and sections, gathers and
//! summarizes evidence per section, self-assesses completeness, and
//! synthesizes a report, all over one shared [`state::ResearchState`]
//! aggregate that only moves by applying typed partial updates.
//!
//! # Workflow
//!
//! ```text
//! ┌──────────────┐    ┌───────────────────┐    ┌─────────┐
//! │ plan_queries │ ─▶ │ research_sections │ ─▶ │ reflect │
//! └──────────────┘    └───────────────────┘    └────┬────┘
//!                               ▲                   │
//!                               └──── continue ─────┤
//!                                                   ▼
//!                                          ┌──────────────┐
//!                                          │ write_report │ ─▶ END
//!                                          └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use deep_research::{AgentConfig, DeepSeekClient, ResearchAgentBuilder, TavilyClient};
//!
//! let config = AgentConfig::from_env()?;
//! config.validate()?;
//!
//! let generator = Arc::new(DeepSeekClient::new(&config.api_key, &config.model));
//! let search = Arc::new(TavilyClient::new(&config.tavily_api_key));
//!
//! let agent = ResearchAgentBuilder::new(generator, search)
//!     .config(config)
//!     .build()?;
//!
//! let state = agent.run_new_session("What is context engineering?").await?;
//! println!("{}", state.report_draft);
//! ```
//!
//! Backends are injected behind the [`llm::TextGenerator`] and
//! [`search::SearchProvider`] traits; checkpoint stores behind
//! [`checkpoint::Checkpointer`]. Nothing in the core reads process-wide
//! configuration.

pub mod agent;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod parse;
pub mod prompts;
pub mod search;
pub mod state;
pub mod steps;

pub use agent::{ReflectPolicy, ResearchAgent, ResearchAgentBuilder, RouteDecision};
pub use checkpoint::{Checkpointer, FileCheckpointer, MemoryCheckpointer};
pub use config::AgentConfig;
pub use engine::{Step, StepError, Workflow, WorkflowBuilder, END};
pub use error::AgentError;
pub use llm::{ChatMessage, DeepSeekClient, LlmError, Role, TextGenerator};
pub use search::{SearchDepth, SearchError, SearchHit, SearchProvider, TavilyClient};
pub use state::{
    ResearchState, ResearchUpdate, SectionResult, SourceRecord, StateUpdate, WorkflowState,
};
