use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use feedsage_core::config::{Config, EmbeddingConfig, get_config_path};

const PROVIDERS: &[&str] = &["openai", "ollama"];
const OPENAI_MODELS: &[&str] = &["gpt-4o-mini", "gpt-4o", "gpt-4.1-mini", "gpt-4.1"];

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn setup_provider() -> Result<String> {
    let selection = Select::new()
        .with_prompt("Select your model provider")
        .items(PROVIDERS)
        .default(0)
        .interact()
        .context("Failed to select provider")?;

    Ok(PROVIDERS[selection].to_string())
}

fn setup_api_key() -> Result<String> {
    let api_key: String = Input::new()
        .with_prompt("Enter your OpenAI API key (leave empty to use OPENAI_API_KEY)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read API key")?;

    Ok(api_key.trim().to_string())
}

fn setup_openai_model() -> Result<String> {
    let selection = Select::new()
        .with_prompt("Select your chat model")
        .items(OPENAI_MODELS)
        .default(0)
        .interact()
        .context("Failed to select model")?;

    Ok(OPENAI_MODELS[selection].to_string())
}

fn setup_ollama() -> Result<(String, String, String)> {
    let base_url: String = Input::new()
        .with_prompt("Ollama base URL")
        .default("http://localhost:11434".to_string())
        .interact_text()
        .context("Failed to read base URL")?;
    let model: String = Input::new()
        .with_prompt("Chat model (must support tool calling)")
        .default("llama3.2".to_string())
        .interact_text()
        .context("Failed to read model")?;
    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default("nomic-embed-text".to_string())
        .interact_text()
        .context("Failed to read embedding model")?;

    Ok((base_url, model, embedding_model))
}

pub fn run_onboard() -> Result<Config> {
    println!();
    println!("  {}", style("Welcome to feedsage!").white().bold());
    println!(
        "  {}",
        style("Ask questions about the articles in your RSS feeds.").dim()
    );

    print_step(1, 2, "Provider");
    let provider = setup_provider()?;

    print_step(2, 2, "Model");
    let config = if provider == "ollama" {
        let (base_url, model, embedding_model) = setup_ollama()?;
        Config {
            provider: Some(provider),
            base_url: Some(base_url.clone()),
            model,
            embedding: EmbeddingConfig {
                provider: Some("ollama".to_string()),
                model: embedding_model,
                base_url: Some(base_url),
            },
            ..Config::default()
        }
    } else {
        let api_key = setup_api_key()?;
        let model = setup_openai_model()?;
        Config {
            provider: Some(provider),
            api_key,
            model,
            ..Config::default()
        }
    };

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(get_config_path().display()).cyan()
    );
    println!(
        "  {} {} feeds configured; edit the config file to change them",
        style("→").green(),
        config.feeds.len()
    );
    println!();
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("feedsage ingest").cyan().bold()
    );
    println!();

    Ok(config)
}
