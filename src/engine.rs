//! Workflow graph builder and executor.
//!
//! A workflow is a set of named steps, a fixed entry point, and one outgoing
//! edge per step, either direct or routed by a decision function over the
//! current state. The builder validates the topology (entry exists, every
//! step has an edge, every target is a known step or [`END`]) before
//! producing an executable [`Workflow`].
//!
//! The executor drives one step at a time: run the step against a snapshot
//! of the state, apply its update only on success (a failed step merges
//! nothing), persist a checkpoint when a store is configured, then follow
//! the outgoing edge until [`END`] or a terminal state is reached. A
//! transition cap bounds the run even if the routing never converges.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::checkpoint::{CheckpointError, Checkpointer};
use crate::state::WorkflowState;

/// Sentinel edge target marking workflow termination.
pub const END: &str = "END";

const DEFAULT_MAX_TRANSITIONS: usize = 64;

/// A single unit of work in the workflow.
#[async_trait]
pub trait Step<S: WorkflowState>: Send + Sync {
    /// Execute against a snapshot of the state, producing a partial update.
    async fn run(&self, state: &S) -> Result<S::Update, StepError>;
}

/// Failure surfaced by a step. The step's update is discarded entirely.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StepError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StepError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn caused_by(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

type Router<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

enum Edge<S> {
    Direct(String),
    Conditional {
        router: Router<S>,
        branches: HashMap<String, String>,
    },
}

/// Errors detected while validating a workflow definition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowBuildError {
    #[error("workflow entry point not set")]
    NoEntryPoint,

    #[error("unknown step id: {0}")]
    UnknownStep(String),

    #[error("step '{0}' has no outgoing edge")]
    MissingEdge(String),
}

/// Errors raised while driving a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("step '{step}' failed: {source}")]
    Step {
        step: String,
        #[source]
        source: StepError,
    },

    #[error("no branch named '{decision}' out of step '{step}'")]
    UnknownRoute { step: String, decision: String },

    #[error("no step registered under id '{0}'")]
    MissingStep(String),

    #[error("transition limit of {0} exceeded")]
    TransitionLimit(usize),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// Fluent builder for workflow definitions.
pub struct WorkflowBuilder<S: WorkflowState> {
    name: String,
    steps: HashMap<String, Arc<dyn Step<S>>>,
    edges: HashMap<String, Edge<S>>,
    entry: Option<String>,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    max_transitions: usize,
}

impl<S: WorkflowState> Default for WorkflowBuilder<S> {
    fn default() -> Self {
        Self {
            name: String::new(),
            steps: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            checkpointer: None,
            max_transitions: DEFAULT_MAX_TRANSITIONS,
        }
    }
}

impl<S: WorkflowState> WorkflowBuilder<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register a step under an id.
    pub fn step(mut self, id: impl Into<String>, step: impl Step<S> + 'static) -> Self {
        self.steps.insert(id.into(), Arc::new(step));
        self
    }

    /// Set the entry step.
    pub fn entry(mut self, id: impl Into<String>) -> Self {
        self.entry = Some(id.into());
        self
    }

    /// Add an unconditional edge.
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.insert(from.into(), Edge::Direct(to.into()));
        self
    }

    /// Add a routed edge: `router` names a branch, branches map to targets.
    ///
    /// Every declared branch stays part of the topology whether or not the
    /// router ever selects it.
    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        router: impl Fn(&S) -> String + Send + Sync + 'static,
        branches: Vec<(&str, &str)>,
    ) -> Self {
        self.edges.insert(
            from.into(),
            Edge::Conditional {
                router: Arc::new(router),
                branches: branches
                    .into_iter()
                    .map(|(decision, target)| (decision.to_string(), target.to_string()))
                    .collect(),
            },
        );
        self
    }

    /// Attach a checkpoint store; state is persisted after each transition.
    pub fn checkpointer(mut self, store: Arc<dyn Checkpointer<S>>) -> Self {
        self.checkpointer = Some(store);
        self
    }

    /// Override the runaway guard on executed steps per run.
    pub fn max_transitions(mut self, max: usize) -> Self {
        self.max_transitions = max;
        self
    }

    /// Validate and build the workflow.
    pub fn build(self) -> Result<Workflow<S>, WorkflowBuildError> {
        let entry = self.entry.ok_or(WorkflowBuildError::NoEntryPoint)?;
        if !self.steps.contains_key(&entry) {
            return Err(WorkflowBuildError::UnknownStep(entry));
        }

        let known = |target: &str| target == END || self.steps.contains_key(target);

        for (from, edge) in &self.edges {
            if !self.steps.contains_key(from) {
                return Err(WorkflowBuildError::UnknownStep(from.clone()));
            }
            match edge {
                Edge::Direct(to) => {
                    if !known(to) {
                        return Err(WorkflowBuildError::UnknownStep(to.clone()));
                    }
                }
                Edge::Conditional { branches, .. } => {
                    for target in branches.values() {
                        if !known(target) {
                            return Err(WorkflowBuildError::UnknownStep(target.clone()));
                        }
                    }
                }
            }
        }

        for id in self.steps.keys() {
            if !self.edges.contains_key(id) {
                return Err(WorkflowBuildError::MissingEdge(id.clone()));
            }
        }

        Ok(Workflow {
            name: self.name,
            steps: self.steps,
            edges: self.edges,
            entry,
            checkpointer: self.checkpointer,
            max_transitions: self.max_transitions,
        })
    }
}

/// Validated, executable workflow.
pub struct Workflow<S: WorkflowState> {
    name: String,
    steps: HashMap<String, Arc<dyn Step<S>>>,
    edges: HashMap<String, Edge<S>>,
    entry: String,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    max_transitions: usize,
}

impl<S: WorkflowState> Workflow<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Drive the workflow from `initial` to a terminal state.
    pub async fn execute(&self, session_id: &str, initial: S) -> Result<S, WorkflowError> {
        let mut state = initial;
        let mut current = self.entry.clone();
        let mut transitions = 0usize;

        loop {
            if transitions >= self.max_transitions {
                return Err(WorkflowError::TransitionLimit(self.max_transitions));
            }
            transitions += 1;

            let step = self
                .steps
                .get(&current)
                .ok_or_else(|| WorkflowError::MissingStep(current.clone()))?;

            debug!(workflow = %self.name, step = %current, "running step");
            let update = step
                .run(&state)
                .await
                .map_err(|source| WorkflowError::Step {
                    step: current.clone(),
                    source,
                })?;

            state = state.apply_update(update);

            if let Some(store) = &self.checkpointer {
                store.save(session_id, &state).await?;
            }

            if state.is_terminal() {
                info!(workflow = %self.name, step = %current, "state is terminal, stopping");
                break;
            }

            match self.resolve_next(&current, &state)? {
                Some(next) => current = next,
                None => break,
            }
        }

        Ok(state)
    }

    fn resolve_next(&self, current: &str, state: &S) -> Result<Option<String>, WorkflowError> {
        let edge = self
            .edges
            .get(current)
            .ok_or_else(|| WorkflowError::MissingStep(current.to_string()))?;

        let target = match edge {
            Edge::Direct(to) => to.clone(),
            Edge::Conditional { router, branches } => {
                let decision = router(state);
                let target =
                    branches
                        .get(&decision)
                        .ok_or_else(|| WorkflowError::UnknownRoute {
                            step: current.to_string(),
                            decision: decision.clone(),
                        })?;
                debug!(step = %current, %decision, %target, "routing decision");
                target.clone()
            }
        };

        if target == END {
            Ok(None)
        } else {
            Ok(Some(target))
        }
    }
}
