use std::time::Duration;
use thiserror::Error;

/// Failures that end an agent run. Tool failures never appear here; they are
/// turned into result text the model can react to.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("generation failed: {0:#}")]
    Generation(#[source] anyhow::Error),

    #[error("generation timed out after {}s", .0.as_secs())]
    GenerationTimeout(Duration),

    #[error("agent loop exceeded {iterations} iterations without a final answer")]
    LoopExceeded { iterations: usize },
}

impl AgentError {
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, Self::Generation(_) | Self::GenerationTimeout(_))
    }
}

/// A single feed that could not be ingested.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to parse feed {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: feed_rs::parser::ParseFeedError,
    },
}

impl IngestError {
    pub fn url(&self) -> &str {
        match self {
            Self::Fetch { url, .. } | Self::Status { url, .. } | Self::Parse { url, .. } => url,
        }
    }
}
