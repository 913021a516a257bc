use anyhow::Result;
use clap::{Parser, Subcommand};
use feedsage_core::agent::{AgentLoop, ContextBuilder, ToolRegistry};
use feedsage_core::config::{self, Config};
use feedsage_core::ingest::{self, FeedIngestor};
use feedsage_core::store::VectorStore;
use feedsage_core::tools::RetrieverTool;
use feedsage_core::traits::DocumentStore;
use feedsage_core::{embeddings, providers, store};
use std::sync::Arc;

mod onboard;
mod session;

#[derive(Parser)]
#[command(name = "feedsage")]
#[command(about = "feedsage - ask questions about the articles in your RSS feeds", long_about = None)]
struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config file interactively
    Onboard,
    /// Fetch the configured feeds and build the article index
    Ingest {
        /// Add to the existing collection instead of rebuilding it
        #[arg(long)]
        append: bool,
    },
    /// Ask questions about the indexed articles
    Chat {
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Show configuration and index status
    Status,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "feedsage=debug,feedsage_core=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn build_index(config: &Config, append: bool) -> Result<Arc<VectorStore>> {
    let embedder = embeddings::create_embedder(config)?;
    let store = store::open_store(config, embedder).await?;

    let ingestor = FeedIngestor::new(config.feeds.clone());
    let report = ingestor.ingest().await;

    for (url, entries) in &report.loaded {
        println!("Loaded {} entries from {}", entries, url);
    }
    for failure in &report.failures {
        eprintln!("⚠️  Skipped {}: {}", failure.url(), failure);
    }

    let documents = report.documents.len();
    let added = ingest::index_report(&store, report, append).await?;

    println!(
        "Collection '{}' holds {} documents ({} new of {} ingested)",
        config.collection_name,
        store.count().await,
        added,
        documents
    );

    Ok(store)
}

async fn build_agent(config: &Config) -> Result<AgentLoop> {
    let store = if VectorStore::exists(&config.persist_directory, &config.collection_name) {
        let embedder = embeddings::create_embedder(config)?;
        store::open_store(config, embedder).await?
    } else {
        println!("No article index found, ingesting feeds first...");
        build_index(config, false).await?
    };

    let provider = providers::create_provider(config)?;

    let retriever = RetrieverTool::new(store).with_k(config.retrieval_k);
    let tool_registry = ToolRegistry::new()
        .with_tool(Arc::new(retriever))
        .with_timeout(config.tool_timeout());

    let mut context_builder = ContextBuilder::new();
    if let Some(prompt) = &config.system_prompt {
        context_builder = context_builder.with_system_prompt(prompt.clone());
    }

    let agent = AgentLoop::new(provider, context_builder, Arc::new(tool_registry))
        .with_max_iterations(config.iteration_guard())
        .with_generation_timeout(config.generation_timeout());

    Ok(agent)
}

async fn print_status(config: &Config) {
    println!("Config:      {}", config::get_config_path().display());
    println!(
        "Provider:    {} ({})",
        config.provider.as_deref().unwrap_or("openai"),
        config.model
    );
    println!("Feeds:       {}", config.feeds.len());
    println!("Collection:  {}", config.collection_path().display());

    if !VectorStore::exists(&config.persist_directory, &config.collection_name) {
        println!("Documents:   not indexed yet (run 'feedsage ingest')");
        return;
    }

    let count = match embeddings::create_embedder(config) {
        Ok(embedder) => match store::open_store(config, embedder).await {
            Ok(store) => store.count().await.to_string(),
            Err(e) => format!("unreadable ({:#})", e),
        },
        Err(e) => format!("unknown ({})", e),
    };
    println!("Documents:   {}", count);
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = cli.command.unwrap_or_else(|| {
        if !config::config_exists() && std::env::var("OPENAI_API_KEY").is_err() {
            Commands::Onboard
        } else {
            Commands::Chat { message: None }
        }
    });

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard().map_err(|e| {
                eprintln!("❌ Onboarding failed: {}", e);
                anyhow::anyhow!("Onboarding failed: {}", e)
            })?;
            config::save_config(&onboard_config)?;
        }
        Commands::Ingest { append } => {
            let config = Config::load_or_init()?;
            build_index(&config, append).await?;
        }
        Commands::Chat { message } => {
            let config = Config::load_or_init()?;
            let agent = build_agent(&config).await?;

            if let Some(msg) = message {
                println!("\n🤔 Processing...");
                match agent.invoke(&msg).await {
                    Ok(answer) => session::print_answer(&answer),
                    Err(e) => {
                        eprintln!("❌ Error: {}", e);
                        anyhow::bail!("Agent processing failed: {}", e);
                    }
                }
            } else {
                session::run_interactive(&agent).await?;
            }
        }
        Commands::Status => {
            let config = Config::load_or_init()?;
            print_status(&config).await;
        }
    }

    Ok(())
}
