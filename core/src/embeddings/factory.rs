use crate::config::Config;
use crate::embeddings::{OllamaEmbedder, OpenAIEmbedder};
use crate::providers::factory::{OPENAI_KEY_VARS, resolve_api_key_with_fallback};
use crate::traits::Embedder;
use anyhow::{Result, anyhow};
use std::sync::Arc;

/// The embedding backend follows the chat provider unless configured separately.
pub fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let provider_name = config
        .embedding
        .provider
        .as_deref()
        .or(config.provider.as_deref())
        .unwrap_or("openai");

    match provider_name.to_lowercase().as_str() {
        "ollama" => {
            let mut embedder = OllamaEmbedder::new().with_model(config.embedding.model.clone());
            if let Some(base_url) = &config.embedding.base_url {
                embedder = embedder.with_base_url(base_url.clone());
            }
            Ok(Arc::new(embedder))
        }
        "openai" => {
            let api_key = resolve_api_key_with_fallback(OPENAI_KEY_VARS, &config.api_key)?;
            let mut embedder =
                OpenAIEmbedder::new(api_key).with_model(config.embedding.model.clone());
            let base_url = config.embedding.base_url.as_ref().or(config.base_url.as_ref());
            if let Some(base_url) = base_url {
                embedder = embedder.with_base_url(base_url.clone());
            }
            Ok(Arc::new(embedder))
        }
        _ => Err(anyhow!(
            "Unknown embedding provider: {}. Available: openai, ollama",
            provider_name
        )),
    }
}
