//! CLI entrypoint for callsheet
//!
//! This is the main binary that wires together all layers using
//! dependency injection: configuration → providers → registry →
//! orchestration run.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use callsheet_application::{
    NoRunLogger, RunLogger, RunOrchestration, Termination, ToolExecutorPort,
};
use callsheet_infrastructure::{
    CastLookupToolProvider, ChannelSession, ChannelToolProvider, ConfigLoader, FileConfig,
    HttpReasoningGateway, HttpRetrievalBackend, JsonFileCastStore, JsonlRunLogger,
    RetrievalToolProvider, ToolRegistry,
};

/// System prompt for the agent.
const SYSTEM_PROMPT: &str = "You are an assistant answering questions about films and their casts. \
You have tools to search a knowledge base and look up cast members by id. \
Use them when a question needs facts you do not have, then answer concisely, \
citing what the tools returned.";

#[derive(Parser)]
#[command(
    name = "callsheet",
    about = "Tool-orchestrating Q&A agent for media knowledge bases",
    version
)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Explicit configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one orchestration for a question
    Ask {
        question: String,

        /// Override the configured iteration limit
        #[arg(long)]
        max_iterations: Option<usize>,
    },
    /// Discover and list the available tools
    Tools,
    /// Show configuration sources and validation status
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Command::Config => {
            ConfigLoader::print_config_sources();
            let config = ConfigLoader::load(cli.config.as_ref())?;
            match config.validate() {
                Ok(()) => println!("\nConfiguration is valid."),
                Err(e) => println!("\nConfiguration error: {}", e),
            }
            Ok(())
        }
        Command::Tools => run_tools(cli.config.as_ref()).await,
        Command::Ask {
            question,
            max_iterations,
        } => run_ask(cli.config.as_ref(), &question, max_iterations).await,
    }
}

/// Build the registry from configuration.
///
/// A collaborator that cannot be reached is a failed tool-set, not a
/// failed run: it is logged and skipped, and the run continues with the
/// remaining tools. Returned sessions are the channel handles the caller
/// must shut down on every exit path.
async fn build_registry(
    config: &FileConfig,
    logger: Arc<dyn RunLogger>,
) -> (ToolRegistry, Vec<Arc<ChannelSession>>) {
    let mut registry = ToolRegistry::new().with_logger(logger);
    let mut sessions = Vec::new();

    if !config.retrieval.endpoint.is_empty() {
        let backend = Arc::new(HttpRetrievalBackend::new(&config.retrieval.endpoint));
        registry = registry.register(RetrievalToolProvider::new(
            backend,
            config.retrieval.min_score,
            config.retrieval.max_results,
        ));
    }

    if let Some(path) = &config.cast_store.path {
        match JsonFileCastStore::open(
            &config.cast_store.table,
            &config.cast_store.key_attribute,
            path,
        ) {
            Ok(store) => {
                registry = registry.register(CastLookupToolProvider::new(Arc::new(store)));
            }
            Err(e) => warn!("cast store unavailable: {}", e),
        }
    }

    for server in &config.tool_servers {
        match ChannelToolProvider::connect(server.to_channel_config()).await {
            Ok(provider) => {
                sessions.push(provider.session().clone());
                registry = registry.register(provider);
            }
            Err(e) => warn!("tool server `{}` unavailable: {}", server.name, e),
        }
    }

    (registry, sessions)
}

async fn shutdown_all(sessions: &[Arc<ChannelSession>]) {
    for session in sessions {
        session.shutdown().await;
    }
}

async fn run_tools(config_path: Option<&PathBuf>) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;
    config.validate()?;

    let (mut registry, sessions) = build_registry(&config, Arc::new(NoRunLogger)).await;
    let result = registry.discover().await;

    if let Ok(report) = &result {
        for tool in registry.tools() {
            let provider = registry
                .provider_for(&tool.name)
                .map(|p| p.id().to_string())
                .unwrap_or_default();
            println!("{:<20} {:<18} {}", tool.name, provider, tool.description);
        }
        for skipped in &report.skipped {
            println!("(skipped {}: {})", skipped.id, skipped.reason);
        }
    }

    shutdown_all(&sessions).await;
    result?;
    Ok(())
}

async fn run_ask(
    config_path: Option<&PathBuf>,
    question: &str,
    max_iterations: Option<usize>,
) -> Result<()> {
    // Configuration problems are fatal before any process spawns.
    let config = ConfigLoader::load(config_path)?;
    config.validate()?;

    let logger: Arc<dyn RunLogger> = match &config.run.run_log {
        Some(path) => match JsonlRunLogger::new(path) {
            Some(logger) => Arc::new(logger),
            None => Arc::new(NoRunLogger),
        },
        None => Arc::new(NoRunLogger),
    };

    let api_key = std::env::var(&config.reasoning.api_key_env).ok();
    let gateway = Arc::new(
        HttpReasoningGateway::new(&config.reasoning.endpoint, &config.reasoning.model)
            .with_api_key(api_key)
            .with_system_prompt(SYSTEM_PROMPT),
    );

    let (mut registry, sessions) = build_registry(&config, logger.clone()).await;
    let report = match registry.discover().await {
        Ok(report) => report,
        Err(e) => {
            shutdown_all(&sessions).await;
            return Err(e.into());
        }
    };
    for skipped in &report.skipped {
        warn!("provider `{}` skipped: {}", skipped.id, skipped.reason);
    }
    info!(tools = report.tool_count, "tool discovery complete");

    // Ctrl-C cancels the run; the cancellation cascades into channel
    // shutdown below.
    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
    }

    let orchestrator = RunOrchestration::new(gateway, Arc::new(registry))
        .with_max_iterations(max_iterations.unwrap_or(config.run.max_iterations))
        .with_cancellation(token)
        .with_logger(logger);
    let outcome = orchestrator.execute(question).await;

    // Channel teardown happens on every exit path; no process outlives
    // the run.
    shutdown_all(&sessions).await;
    let outcome = outcome?;

    match outcome.termination {
        Termination::Completed => {
            println!("{}", outcome.answer.unwrap_or_default());
            Ok(())
        }
        termination => {
            if let Some(partial) = &outcome.answer {
                println!("{}", partial);
                println!();
            }
            eprintln!(
                "Run aborted after {} iteration(s): {}",
                outcome.iterations, termination
            );
            std::process::exit(1);
        }
    }
}
