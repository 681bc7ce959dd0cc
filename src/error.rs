//! Top-level error taxonomy.
//!
//! Boundary errors stay typed in their own modules; this rollup is what the
//! public entry points return.

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::engine::{WorkflowBuildError, WorkflowError};
use crate::llm::LlmError;
use crate::search::SearchError;

/// Any failure surfaced by the research agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("generation backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("search backend error: {0}")]
    Search(#[from] SearchError),

    #[error("checkpoint store error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("workflow definition error: {0}")]
    WorkflowBuild(#[from] WorkflowBuildError),

    #[error("workflow execution error: {0}")]
    Workflow(#[from] WorkflowError),
}
