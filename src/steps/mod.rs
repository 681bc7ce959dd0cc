//! Workflow steps for the research pipeline.
//!
//! Each step is a plain struct holding its collaborator handles and
//! implementing [`crate::engine::Step`] over [`crate::state::ResearchState`].
//! Steps never touch the state directly; they return a typed partial update
//! the engine merges.

pub mod planner;
pub mod reflector;
pub mod researcher;
pub mod synthesizer;

pub use planner::QueryPlanner;
pub use reflector::QualityReflector;
pub use researcher::SectionResearcher;
pub use synthesizer::ReportSynthesizer;
