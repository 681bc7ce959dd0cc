//! CLI front-end for the research agent.
//!
//! Collects a query, wires the DeepSeek and Tavily backends plus an optional
//! file checkpoint store, runs the workflow, and prints the report. Run-level
//! failures are rendered here; the core only returns them.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use deep_research::{
    AgentConfig, DeepSeekClient, FileCheckpointer, ResearchAgentBuilder, TavilyClient,
};

#[derive(Parser, Debug)]
#[command(
    name = "deep-research",
    version,
    about = "Autonomous multi-step research from the command line"
)]
struct Args {
    /// The topic to research
    #[arg(value_name = "QUERY")]
    query: String,

    /// Session id to create or resume (random when omitted)
    #[arg(short, long)]
    session: Option<String>,

    /// Chat model override
    #[arg(short, long, env = "DEEPSEEK_MODEL")]
    model: Option<String>,

    /// Disable checkpoint persistence for this run
    #[arg(long)]
    no_checkpoint: bool,

    /// Enable verbose/debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = AgentConfig::from_env()?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if args.no_checkpoint {
        config.checkpointing = false;
    }
    config.validate()?;

    info!(
        model = %config.model,
        max_iterations = config.max_iterations,
        checkpointing = config.checkpointing,
        "configuration loaded"
    );

    let generator = Arc::new(
        DeepSeekClient::new(&config.api_key, &config.model)
            .with_base_url(&config.base_url)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens),
    );
    let search = Arc::new(TavilyClient::new(&config.tavily_api_key));

    let mut builder = ResearchAgentBuilder::new(generator, search).config(config.clone());
    if config.checkpointing {
        builder = builder.checkpointer(Arc::new(FileCheckpointer::new(
            &config.checkpoint_dir,
            false,
        )));
    }
    let agent = builder.build()?;

    let session_id = args
        .session
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    match agent.run(&args.query, &session_id).await {
        Ok(state) => {
            println!("\n{}", "=".repeat(60));
            println!("RESEARCH REPORT");
            println!("{}\n", "=".repeat(60));
            println!("{}", state.report_draft);

            if let Some(score) = state.confidence_score {
                println!("\nConfidence: {:.0}%", score * 100.0);
            }
            println!("Session: {session_id}");

            info!(
                iterations = state.iteration_count,
                sources = state.sources.len(),
                "research completed"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "research run failed");
            eprintln!("\nResearch failed: {e}");
            Err(e.into())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
