use crate::config::Config;
use crate::providers::{OllamaProvider, OpenAIProvider};
use crate::traits::Provider;
use anyhow::{Result, anyhow};
use std::sync::Arc;

pub(crate) const OPENAI_KEY_VARS: &[&str] = &["OPENAI_API_KEY", "FEEDSAGE_OPENAI_API_KEY"];

pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let provider_name = config.provider.as_deref().unwrap_or("openai");

    match provider_name.to_lowercase().as_str() {
        "ollama" => {
            let mut provider = OllamaProvider::new()
                .with_model(config.model.clone())
                .with_temperature(config.temperature);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }
        "openai" => {
            let api_key = resolve_api_key_with_fallback(OPENAI_KEY_VARS, &config.api_key)?;
            let mut provider = OpenAIProvider::new(api_key)
                .with_model(config.model.clone())
                .with_temperature(config.temperature);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }
        _ => Err(anyhow!(
            "Unknown provider: {}. Available: openai, ollama",
            provider_name
        )),
    }
}

pub(crate) fn resolve_api_key_with_fallback(
    env_vars: &[&str],
    config_key: &str,
) -> Result<String> {
    for var_name in env_vars {
        if let Ok(key) = resolve_api_key_from_env(var_name) {
            return Ok(key);
        }
    }
    if !config_key.is_empty() {
        Ok(config_key.to_string())
    } else {
        Err(anyhow!(
            "No API key found. Set {} or add api_key to the config file.",
            env_vars.join(" / ")
        ))
    }
}

fn resolve_api_key_from_env(var_name: &str) -> Result<String> {
    std::env::var(var_name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("Environment variable {} not set", var_name))
}
