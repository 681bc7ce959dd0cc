//! Agent configuration.
//!
//! Every knob is an explicit value handed to the agent at construction; no
//! step reads the process environment. `from_env` exists for the CLI and
//! loads a `.env` file when one is present.

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

use crate::search::SearchDepth;

/// Configuration consumed by the research agent and its backends.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Chat model identifier (e.g. "deepseek-chat")
    pub model: String,

    /// Base URL of the OpenAI-compatible chat endpoint
    pub base_url: String,

    /// API key for the chat backend
    pub api_key: String,

    /// API key for the Tavily search backend
    pub tavily_api_key: String,

    /// Sampling temperature for model calls
    pub temperature: f32,

    /// Maximum output tokens per model call
    pub max_tokens: u32,

    /// Search results requested per query
    pub search_max_results: u32,

    /// Search thoroughness
    pub search_depth: SearchDepth,

    /// Hard cap on research iterations; the only termination guarantee
    /// independent of model output
    pub max_iterations: u32,

    /// Bound on concurrently researched queries
    pub search_concurrency: usize,

    /// Whether to persist session checkpoints
    pub checkpointing: bool,

    /// Directory for the file checkpoint store
    pub checkpoint_dir: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-chat".to_string(),
            base_url: "https://api.deepseek.com".to_string(),
            api_key: String::new(),
            tavily_api_key: String::new(),
            temperature: 0.7,
            max_tokens: 4096,
            search_max_results: 5,
            search_depth: SearchDepth::Advanced,
            max_iterations: 10,
            search_concurrency: 4,
            checkpointing: true,
            checkpoint_dir: PathBuf::from("./checkpoints"),
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables, `.env` included.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = AgentConfig::default();

        if let Ok(val) = env::var("DEEPSEEK_API_KEY") {
            config.api_key = val;
        }
        if let Ok(val) = env::var("TAVILY_API_KEY") {
            config.tavily_api_key = val;
        }
        if let Ok(val) = env::var("DEEPSEEK_MODEL") {
            config.model = val;
        }
        if let Ok(val) = env::var("DEEPSEEK_BASE_URL") {
            config.base_url = val;
        }
        if let Ok(val) = env::var("DEEPSEEK_TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("DEEPSEEK_TEMPERATURE must be a floating-point number (e.g. 0.7)")?;
        }
        if let Ok(val) = env::var("DEEPSEEK_MAX_TOKENS") {
            config.max_tokens = val
                .parse()
                .context("DEEPSEEK_MAX_TOKENS must be a positive integer")?;
        }
        if let Ok(val) = env::var("TAVILY_MAX_RESULTS") {
            config.search_max_results = val
                .parse()
                .context("TAVILY_MAX_RESULTS must be a positive integer")?;
        }
        if let Ok(val) = env::var("TAVILY_SEARCH_DEPTH") {
            config.search_depth = val
                .parse()
                .map_err(|e: String| anyhow::anyhow!("TAVILY_SEARCH_DEPTH: {e}"))?;
        }
        if let Ok(val) = env::var("MAX_ITERATIONS") {
            config.max_iterations = val
                .parse()
                .context("MAX_ITERATIONS must be a positive integer")?;
        }
        if let Ok(val) = env::var("SEARCH_CONCURRENCY") {
            config.search_concurrency = val
                .parse()
                .context("SEARCH_CONCURRENCY must be a positive integer")?;
        }
        if let Ok(val) = env::var("ENABLE_CHECKPOINTS") {
            config.checkpointing = matches!(val.as_str(), "1" | "true" | "yes");
        }
        if let Ok(val) = env::var("CHECKPOINT_DIR") {
            config.checkpoint_dir = PathBuf::from(val);
        }

        Ok(config)
    }

    /// Reject unusable configurations before a run is constructed.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            bail!("DEEPSEEK_API_KEY not found in environment variables");
        }
        if self.tavily_api_key.is_empty() {
            bail!("TAVILY_API_KEY not found in environment variables");
        }
        if self.model.is_empty() {
            bail!("model identifier cannot be empty");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!(
                "temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }
        if self.search_max_results == 0 {
            bail!("TAVILY_MAX_RESULTS must be at least 1");
        }
        if self.max_iterations == 0 {
            bail!("MAX_ITERATIONS must be at least 1");
        }
        if self.search_concurrency == 0 {
            bail!("SEARCH_CONCURRENCY must be at least 1");
        }
        Ok(())
    }
}
