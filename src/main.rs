//! Ferret - agentic web search assistant
//!
//! Main entry point for the CLI application.

use anyhow::Context;
use clap::Parser;
use ferret::agent::ChatRequest;
use ferret::core::config::AgentConfig;
use ferret::tools::search::format_results;
use ferret::tools::{SearchClient, SearchProvider};
use ferret::{Agent, Config, Repl};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Ferret - answers questions, searching the web when it needs to
#[derive(Parser, Debug)]
#[command(name = "ferret")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (default: gpt-5)
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Run one web search and print the results
    #[arg(long, short = 's', conflicts_with = "prompt")]
    search: Option<String>,

    /// Results to request with --search
    #[arg(long)]
    max_results: Option<u32>,

    /// Resume a saved chat in the REPL
    #[arg(long)]
    chat: Option<Uuid>,

    /// Sampling temperature for --prompt (ignored by gpt-5)
    #[arg(long)]
    temperature: Option<f32>,

    /// Token cap for the answer in --prompt mode
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,

    /// Write the current settings to the config file and exit
    #[arg(long)]
    init_config: bool,
}

fn init_logging(debug: bool) {
    let default = if debug { "ferret=debug" } else { "ferret=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logging comes first so config loading can report a broken file
    init_logging(args.debug || AgentConfig::default().debug);

    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref model) = args.model {
        config.models.default = model.clone();
    }
    if args.debug {
        config.agent.debug = true;
    }

    if args.init_config {
        return init_config(&config);
    }

    if let Some(keyword) = args.search {
        return run_search(&config, &keyword, args.max_results).await;
    }

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        let agent = Agent::from_config(config)?;
        let mut request = ChatRequest::new(prompt);
        request.temperature = args.temperature;
        request.max_tokens = args.max_tokens;

        let response = agent.run_blocking(request).await?;
        println!("{}", response.content);
        if let Some(usage) = response.usage {
            eprintln!(
                "\n[{}] {} tool rounds, {} model calls, tokens: {} prompt + {} completion = {}",
                response.model,
                response.rounds,
                response.model_calls,
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }
        return Ok(());
    }

    // Interactive REPL mode
    let mut repl = Repl::with_config(config).await?;
    if let Some(id) = args.chat {
        repl.session_mut()
            .open(id)
            .await
            .with_context(|| format!("cannot resume chat {}", id))?;
    }
    repl.run().await?;

    Ok(())
}

fn init_config(config: &Config) -> anyhow::Result<()> {
    let path = Config::config_file();
    if path.exists() {
        println!("Config already exists at {}", path.display());
        println!("Defaults for reference:\n\n{}", Config::default_config_toml());
        return Ok(());
    }

    let path = config.save()?;
    println!("Wrote {}", path.display());
    println!("The API token is read from AI_BUILDER_TOKEN and never stored there.");
    Ok(())
}

async fn run_search(config: &Config, keyword: &str, max_results: Option<u32>) -> anyhow::Result<()> {
    let keyword = keyword.trim();
    anyhow::ensure!(!keyword.is_empty(), "search keyword must not be empty");

    let cap = config.search.max_results_cap.max(1);
    let max_results = max_results
        .unwrap_or(config.search.default_max_results)
        .clamp(1, cap);

    let client = SearchClient::from_config(config)?;
    let response = client.search(keyword, max_results).await?;
    let hits = response.require_hits()?;

    if let Some(answer) = response.combined_answer.as_deref() {
        println!("{}\n", answer);
    }
    print!(
        "{}",
        format_results(keyword, hits, hits.len(), config.search.snippet_chars)
    );
    for error in response.errors.iter().flatten() {
        eprintln!("search error: {}", error);
    }

    Ok(())
}
