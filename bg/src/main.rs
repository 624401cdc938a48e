//! brdgen - CLI entry point
//!
//! Wires the knowledge source clients, the LLM client, and the
//! orchestrator, then dispatches CLI commands.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use brdgen::cli::{Cli, Command, OutputFormat};
use brdgen::config::Config;
use brdgen::context::ContextAggregator;
use brdgen::generate::GeneratorAgent;
use brdgen::llm::create_client;
use brdgen::orchestrator::Orchestrator;
use brdgen::prompts::PromptLoader;
use brdgen::verify::VerifierAgent;
use knowledgestore::{ContentSource, GraphClient, LocalContentSource, StructureSource};

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Generate {
            request,
            components,
            evidence,
            format,
        } => cmd_generate(config, request, components, evidence, format).await,
        Command::Epics { brd } => cmd_epics(config, brd).await,
        Command::Backlogs { epics } => cmd_backlogs(config, epics).await,
        Command::Health => cmd_health(config).await,
    }
}

fn build_orchestrator(mut config: Config, include_evidence: bool) -> Result<Orchestrator> {
    config.verification.include_evidence = include_evidence || config.verification.include_evidence;
    config.validate()?;

    let timeout = Duration::from_millis(config.sources.timeout_ms);
    let graph: Arc<dyn StructureSource> = Arc::new(GraphClient::new(&config.sources.graph_url, timeout)?);
    let files: Arc<dyn ContentSource> = Arc::new(LocalContentSource::new(&config.sources.files_root));

    let llm = create_client(&config.llm)?;
    let prompts = PromptLoader::new(&config.sources.files_root);

    let aggregator = ContextAggregator::new(graph.clone(), files.clone(), config.context.clone());
    let generator = GeneratorAgent::new(llm, prompts, config.llm.max_tokens);
    let verifier = VerifierAgent::new(graph, files, config.verification.clone());

    Ok(Orchestrator::new(aggregator, generator, verifier, config.verification))
}

/// Resolve `@path` request arguments to file contents
fn resolve_request(request: &str) -> Result<String> {
    if let Some(path) = request.strip_prefix('@') {
        std::fs::read_to_string(path).context(format!("Failed to read request file {}", path))
    } else {
        Ok(request.to_string())
    }
}

async fn cmd_generate(
    config: Config,
    request: String,
    components: Vec<String>,
    evidence: bool,
    format: OutputFormat,
) -> Result<()> {
    let request = resolve_request(&request)?;
    let orchestrator = build_orchestrator(config, evidence)?;

    let outcome = orchestrator.generate(&request, &components).await?;

    info!(
        verified = outcome.is_verified,
        confidence = outcome.confidence_score,
        iterations = outcome.iterations_used,
        "generation complete"
    );

    match format {
        OutputFormat::Markdown => println!("{}", outcome.document.to_markdown()),
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "document": outcome.document,
                "is_verified": outcome.is_verified,
                "confidence_score": outcome.confidence_score,
                "hallucination_risk": outcome.hallucination_risk,
                "iterations_used": outcome.iterations_used,
                "degraded": outcome.degraded,
                "evidence": outcome.evidence,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    Ok(())
}

async fn cmd_epics(config: Config, brd_path: std::path::PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&brd_path).context("Failed to read BRD file")?;
    let document = serde_json::from_str(&content).context("Failed to parse BRD JSON")?;

    let orchestrator = build_orchestrator(config, false)?;
    let set = orchestrator.generate_epics(&document).await?;

    for warning in &set.warnings {
        tracing::warn!("{}", warning);
    }
    println!("{}", serde_json::to_string_pretty(&set.epics)?);
    Ok(())
}

async fn cmd_backlogs(config: Config, epics_path: std::path::PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&epics_path).context("Failed to read epics file")?;
    let epics: Vec<brdgen::domain::Epic> = serde_json::from_str(&content).context("Failed to parse epics JSON")?;

    let orchestrator = build_orchestrator(config, false)?;
    let set = orchestrator.generate_backlogs(&epics).await?;

    for warning in &set.warnings {
        tracing::warn!("{}", warning);
    }
    println!("{}", serde_json::to_string_pretty(&set.stories)?);
    Ok(())
}

async fn cmd_health(config: Config) -> Result<()> {
    let timeout = Duration::from_millis(config.sources.timeout_ms);
    let graph = GraphClient::new(&config.sources.graph_url, timeout)?;
    let content = LocalContentSource::new(&config.sources.files_root);

    let graph_ok = graph.health_check().await;
    let content_ok = content.health_check();

    println!("graph      {}  {}", if graph_ok { "ok  " } else { "FAIL" }, config.sources.graph_url);
    println!(
        "content    {}  {}",
        if content_ok { "ok  " } else { "FAIL" },
        config.sources.files_root.display()
    );

    if !(graph_ok && content_ok) {
        std::process::exit(1);
    }
    Ok(())
}
