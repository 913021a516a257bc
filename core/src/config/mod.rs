use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const FEEDSAGE_DIR: &str = ".feedsage";

pub const DEFAULT_FEEDS: &[&str] = &[
    "https://news.ycombinator.com/rss",
    "https://ai-techpark.com/category/ai/feed",
    "https://knowtechie.com/category/ai/feed/",
    "https://www.theguardian.com/technology/artificialintelligenceai/rss",
    "https://machinelearningmastery.com/blog/feed",
    "https://www.vox.com/rss/index.xml",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: "text-embedding-3-small".to_string(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f64,
    /// Zero disables the iteration guard.
    pub max_iterations: usize,
    pub generation_timeout_secs: u64,
    pub tool_timeout_secs: u64,
    pub retrieval_k: usize,
    pub min_score: Option<f32>,
    pub system_prompt: Option<String>,
    pub feeds: Vec<String>,
    pub persist_directory: PathBuf,
    pub collection_name: String,
    pub embedding: EmbeddingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_iterations: 10,
            generation_timeout_secs: 120,
            tool_timeout_secs: 60,
            retrieval_k: 5,
            min_score: None,
            system_prompt: None,
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            persist_directory: get_feedsage_dir().join("Agents_db"),
            collection_name: "rss_data".to_string(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        if config_exists() {
            load_config()
        } else {
            Ok(Config::default())
        }
    }

    pub fn iteration_guard(&self) -> Option<usize> {
        (self.max_iterations > 0).then_some(self.max_iterations)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn collection_path(&self) -> PathBuf {
        self.persist_directory
            .join(format!("{}.json", self.collection_name))
    }
}

pub fn get_feedsage_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(FEEDSAGE_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_feedsage_dir().join("config.toml")
}

pub fn ensure_feedsage_dir() -> Result<PathBuf> {
    let dir = get_feedsage_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).with_context(|| {
            format!("Failed to create feedsage directory at {}", dir.display())
        })?;
    }

    Ok(dir)
}

pub fn load_config() -> Result<Config> {
    let config_path = get_config_path();

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!(
                "Config file not found. Run 'feedsage onboard' to set up your configuration."
            )
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    parse_config(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_feedsage_dir()?;

    let config_path = get_config_path();
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}
