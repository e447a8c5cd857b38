//! churn-agent
//!
//! Answers questions about a churn CSV through a tool-using ReAct agent.
//! - `serve`: HTTP API (`/health`, `/chat`, `/metrics`, `/api/tools`)
//! - `chat`: interactive terminal loop
//! - `report`: overview, numeric summary and baseline metrics, no agent

use anyhow::{Context, Result};
use churn_agent::{Agent, AgentConfig, CallMetrics};
use churn_core::Settings;
use churn_data::DatasetCache;
use churn_http::{create_router, AppState, HttpServer};
use churn_llm::{BoxedProvider, LlmProvider, OllamaClient};
use churn_tools::{register_data_tools, DataContext, ToolRegistry};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod cli;
mod report;

#[derive(Parser, Debug)]
#[command(name = "churn-agent")]
#[command(about = "Tool-using agent over a customer churn dataset")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// CSV file to analyse
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Model name on the Ollama backend
    #[arg(long, global = true)]
    model: Option<String>,

    /// Bind address (host:port)
    #[arg(short, long, global = true)]
    bind: Option<String>,

    /// Reasoning steps allowed per turn
    #[arg(long, global = true)]
    max_iterations: Option<usize>,
}

#[derive(clap::Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Serve the HTTP API (default)
    Serve,
    /// Interactive chat on stdin/stdout
    Chat,
    /// Print overview, numeric summary and baseline metrics
    Report,
}

impl Args {
    /// Command-line flags win over the environment
    fn apply(&self, settings: &mut Settings) {
        if let Some(ref data) = self.data {
            settings.data_path = data.clone();
        }
        if let Some(ref model) = self.model {
            settings.model = model.clone();
        }
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
        if let Some(n) = self.max_iterations.filter(|n| *n > 0) {
            settings.max_iterations = n;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    churn_core::config::load_environment();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("churn_service=info".parse()?)
                .add_directive("churn_agent=info".parse()?)
                .add_directive("churn_http=info".parse()?)
                .add_directive("churn_tools=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut settings = Settings::from_env();
    args.apply(&mut settings);

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Report => {
            let text = report::run(&settings).await?;
            println!("{}", text);
        }
        Commands::Chat => {
            let (agent, _) = build_agent(&settings).await?;
            let turns = cli::run(&agent, tokio::io::stdin(), tokio::io::stdout()).await?;
            info!(turns, "Chat session ended");
        }
        Commands::Serve => serve(&settings).await?,
    }

    Ok(())
}

/// Wire the reasoning backend, tools and metrics into one agent
async fn build_agent(settings: &Settings) -> Result<(Arc<Agent>, BoxedProvider)> {
    let provider: BoxedProvider = Arc::new(OllamaClient::with_timeout(
        settings.ollama_url.clone(),
        settings.ollama_api_key.clone(),
        settings.request_timeout,
    ));

    let cache = if settings.dataset_cache {
        DatasetCache::new(settings.cache_capacity)
    } else {
        DatasetCache::disabled()
    };
    let ctx = DataContext::new(
        Arc::new(cache),
        settings.data_path.clone(),
        settings.target_column.clone(),
    );

    let registry = Arc::new(ToolRegistry::new());
    register_data_tools(&registry, ctx)
        .await
        .context("Failed to register data tools")?;
    info!(
        tools = registry.len().await,
        data = %settings.data_path.display(),
        "Initialized Tool Registry"
    );

    let metrics = Arc::new(CallMetrics::new().context("Failed to create call metrics")?);
    let config = AgentConfig {
        model: settings.model.clone(),
        temperature: settings.temperature,
        max_iterations: settings.max_iterations,
        ..AgentConfig::default()
    };
    let agent = Agent::new(provider.clone(), registry, metrics, config);
    Ok((Arc::new(agent), provider))
}

async fn serve(settings: &Settings) -> Result<()> {
    let (agent, provider) = build_agent(settings).await?;

    match provider.list_models().await {
        Ok(models) => info!(
            backend = %settings.ollama_url,
            models = models.len(),
            "Reasoning backend reachable"
        ),
        Err(e) => warn!(
            backend = %settings.ollama_url,
            "Reasoning backend not reachable yet: {:#}", e
        ),
    }

    info!(model = %settings.model, "Starting churn-agent HTTP service");
    HttpServer::builder()
        .bind(settings.bind.clone())
        .timeout(settings.request_timeout)
        .router(create_router(AppState::new(agent)))
        .build()?
        .serve()
        .await?;
    Ok(())
}
