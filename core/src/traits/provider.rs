use crate::traits::ToolSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A generator-issued request to run one tool with a single `query` argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub name: String,
    pub query: String,
}

impl ToolRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            query: query.into(),
        }
    }

    /// Builds a request from the raw JSON argument string a provider returns.
    /// A missing or malformed `query` falls back to the empty string.
    pub fn from_arguments(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: &str,
    ) -> Self {
        let query = serde_json::from_str::<serde_json::Value>(arguments)
            .ok()
            .as_ref()
            .and_then(|v| v.get("query"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Self::new(id, name, query)
    }

    pub fn arguments(&self) -> String {
        serde_json::json!({ "query": self.query }).to_string()
    }
}

/// The answer to one [`ToolRequest`], correlated by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub id: String,
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_requests: Vec<ToolRequest>,
    },
    Tool(ToolResult),
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_requests: Vec::new(),
        }
    }

    pub fn assistant_with_tool_requests(
        content: impl Into<String>,
        tool_requests: Vec<ToolRequest>,
    ) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_requests,
        }
    }

    pub fn tool_result(result: ToolResult) -> Self {
        Self::Tool(result)
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool(_) => "tool",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::System { content } | Self::User { content } | Self::Assistant { content, .. } => {
                content
            }
            Self::Tool(result) => &result.content,
        }
    }

    pub fn tool_requests(&self) -> &[ToolRequest] {
        match self {
            Self::Assistant { tool_requests, .. } => tool_requests,
            _ => &[],
        }
    }
}

/// What one generation step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    FinalAnswer(String),
    ToolRequests {
        text: String,
        requests: Vec<ToolRequest>,
    },
}

impl Generation {
    /// Normalises provider output: a tool-request turn with no requests is a final answer.
    pub fn from_parts(text: Option<String>, requests: Vec<ToolRequest>) -> Self {
        let text = text.unwrap_or_default();
        if requests.is_empty() {
            Self::FinalAnswer(text)
        } else {
            Self::ToolRequests { text, requests }
        }
    }

    pub fn into_message(self) -> ChatMessage {
        match self {
            Self::FinalAnswer(text) => ChatMessage::assistant(text),
            Self::ToolRequests { text, requests } => {
                ChatMessage::assistant_with_tool_requests(text, requests)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub tools: Option<&'a [ToolSpec]>,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<Generation>;
}
