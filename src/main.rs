//! Datalyst - Natural-Language Data Analyst
//!
//! Main entry point for the CLI application.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use datalyst::cli::Repl;
use datalyst::{AgentService, ChatRequest, Config};

/// Datalyst - ask questions about your database in plain language
#[derive(Parser, Debug)]
#[command(name = "datalyst")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model identifier on the provider
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Maximum tool-call cycles per question
    #[arg(long)]
    max_turns: Option<usize>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref model) = args.model {
        config.model.name = model.clone();
    }
    if let Some(max_turns) = args.max_turns {
        config.agent.max_turns = max_turns;
    }
    if args.debug {
        config.agent.debug = true;
    }

    let default_filter = if config.agent.debug {
        "datalyst=debug"
    } else {
        "datalyst=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let service = AgentService::start(&config).await?;

    // The channel is closed on every exit path, errors included
    let outcome = run_session(&args, &service).await;
    if let Err(e) = service.shutdown().await {
        tracing::warn!("shutdown error: {}", e);
    }
    outcome
}

async fn run_session(args: &Args, service: &AgentService) -> anyhow::Result<()> {
    if let Some(ref prompt) = args.prompt {
        let response = service
            .handle(ChatRequest::new(prompt, None))
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        println!("{}", response.answer);
        if let Some(data) = response.data {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        return Ok(());
    }

    let mut repl = Repl::new(service);
    repl.run().await?;
    Ok(())
}
