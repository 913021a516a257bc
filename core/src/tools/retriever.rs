use crate::traits::{Document, DocumentStore, Tool};
use async_trait::async_trait;
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;
use tracing::warn;

pub const RETRIEVER_TOOL_NAME: &str = "retriever_tool";
pub const NO_RESULTS: &str = "I found no relevant information in the articles";
const DEFAULT_K: usize = 5;

pub struct RetrieverTool {
    store: Arc<dyn DocumentStore>,
    k: usize,
}

impl RetrieverTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            k: DEFAULT_K,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }
}

#[async_trait]
impl Tool for RetrieverTool {
    fn name(&self) -> &str {
        RETRIEVER_TOOL_NAME
    }

    fn description(&self) -> &str {
        "This tool searches and returns the information from the articles."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search the articles for"
                }
            },
            "required": ["query"]
        })
    }

    /// Never fails: store errors come back as text the model can read.
    async fn execute(&self, query: &str) -> anyhow::Result<String> {
        match self.store.search(query, self.k).await {
            Ok(docs) if docs.is_empty() => Ok(NO_RESULTS.to_string()),
            Ok(docs) => Ok(format_documents(&docs)),
            Err(e) => {
                warn!(query, "Retrieval failed: {:#}", e);
                Ok(format!("Error searching the articles: {e:#}"))
            }
        }
    }
}

fn format_documents(docs: &[Document]) -> String {
    let mut out = String::new();
    for (i, doc) in docs.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n---\n\n");
        }
        let _ = writeln!(out, "[Document {}]", i + 1);
        for (key, value) in &doc.metadata {
            if !value.is_empty() {
                let _ = writeln!(out, "{key}: {value}");
            }
        }
        let _ = write!(out, "content:\n{}", doc.content.trim());
    }
    out
}
