use crate::traits::{Tool, ToolRequest, ToolResult, ToolSpec};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const UNKNOWN_TOOL_MESSAGE: &str =
    "Incorrect Tool Name, Please Retry and Select tool from List of Available tools.";

/// Name-to-tool mapping. Built once at startup, then shared read-only behind an `Arc`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    timeout: Option<Duration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any tool already registered under the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Runs one request. Always yields a result: unknown names, tool errors and
    /// timeouts are reported as text.
    pub async fn execute(&self, request: &ToolRequest) -> ToolResult {
        info!("Calling Tool: {} with query: {}", request.name, request.query);

        let content = match self.get(&request.name) {
            None => {
                warn!("Tool: {} doesn't exist.", request.name);
                UNKNOWN_TOOL_MESSAGE.to_string()
            }
            Some(tool) => {
                let outcome = match self.timeout {
                    Some(limit) => tokio::time::timeout(limit, tool.execute(&request.query))
                        .await
                        .unwrap_or_else(|_| {
                            Err(anyhow::anyhow!(
                                "Tool '{}' timed out after {}s",
                                request.name,
                                limit.as_secs_f32()
                            ))
                        }),
                    None => tool.execute(&request.query).await,
                };

                match outcome {
                    Ok(text) => {
                        info!("Result length: {}", text.len());
                        text
                    }
                    Err(e) => {
                        warn!(tool = %request.name, "Tool execution failed: {:#}", e);
                        format!("Error executing tool '{}': {:#}", request.name, e)
                    }
                }
            }
        };

        ToolResult {
            id: request.id.clone(),
            name: request.name.clone(),
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the query"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {"query": {"type": "string"}}})
        }

        async fn execute(&self, query: &str) -> anyhow::Result<String> {
            Ok(format!("echo: {query}"))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "fails"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({})
        }

        async fn execute(&self, _query: &str) -> anyhow::Result<String> {
            Err(anyhow::anyhow!("disk on fire"))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Never finishes in time"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({})
        }

        async fn execute(&self, _query: &str) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".into())
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with_tool(Arc::new(EchoTool))
            .with_tool(Arc::new(FailingTool))
            .with_tool(Arc::new(SlowTool))
            .with_timeout(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn known_tool_result_carries_request_id() {
        let result = registry()
            .execute(&ToolRequest::new("call_7", "echo", "hello"))
            .await;
        assert_eq!(result.id, "call_7");
        assert_eq!(result.name, "echo");
        assert_eq!(result.content, "echo: hello");
    }

    #[tokio::test]
    async fn unknown_names_get_the_fixed_sentinel() {
        let registry = registry();
        for name in ["", "retriever", "ECHO", "web_search", "echo "] {
            let result = registry.execute(&ToolRequest::new("id", name, "q")).await;
            assert_eq!(result.content, UNKNOWN_TOOL_MESSAGE);
            assert_eq!(result.name, name);
        }
    }

    #[tokio::test]
    async fn tool_errors_become_text() {
        let result = registry().execute(&ToolRequest::new("id", "fails", "q")).await;
        assert!(result.content.contains("disk on fire"));
    }

    #[tokio::test]
    async fn timeouts_become_text() {
        let result = registry().execute(&ToolRequest::new("id", "slow", "q")).await;
        assert!(result.content.contains("timed out"));
    }

    #[test]
    fn registering_twice_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["echo"]);
        assert_eq!(registry.specs()[0].description, "Echoes the query");
    }
}
