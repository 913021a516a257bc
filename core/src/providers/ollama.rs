use crate::traits::{ChatMessage, ChatRequest, Generation, Provider, ToolRequest, ToolSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OllamaTool<'a>>>,
    options: OllamaOptions,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCallRequest<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct OllamaToolCallRequest<'a> {
    function: OllamaFunctionRequest<'a>,
}

#[derive(Debug, Serialize)]
struct OllamaFunctionRequest<'a> {
    name: &'a str,
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OllamaTool<'a> {
    r#type: &'a str,
    function: OllamaToolFunction<'a>,
}

#[derive(Debug, Serialize)]
struct OllamaToolFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OllamaToolCallResponse>>,
}

#[derive(Debug, Deserialize)]
struct OllamaToolCallResponse {
    #[serde(default)]
    id: Option<String>,
    function: OllamaFunctionResponse,
}

#[derive(Debug, Deserialize)]
struct OllamaFunctionResponse {
    name: String,
    arguments: serde_json::Value,
}

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
}

impl OllamaProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            temperature: 0.0,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    fn convert_messages(messages: &[ChatMessage]) -> Vec<OllamaMessage<'_>> {
        messages
            .iter()
            .map(|m| {
                let tool_calls = match m {
                    ChatMessage::Assistant { tool_requests, .. } if !tool_requests.is_empty() => {
                        Some(
                            tool_requests
                                .iter()
                                .map(|tr| OllamaToolCallRequest {
                                    function: OllamaFunctionRequest {
                                        name: &tr.name,
                                        arguments: serde_json::json!({ "query": tr.query }),
                                    },
                                })
                                .collect(),
                        )
                    }
                    _ => None,
                };

                let tool_name = match m {
                    ChatMessage::Tool(result) => Some(result.name.as_str()),
                    _ => None,
                };

                OllamaMessage {
                    role: m.role(),
                    content: m.content(),
                    tool_calls,
                    tool_name,
                }
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolSpec]) -> Vec<OllamaTool<'_>> {
        tools
            .iter()
            .map(|t| OllamaTool {
                r#type: "function",
                function: OllamaToolFunction {
                    name: &t.name,
                    description: &t.description,
                    parameters: &t.parameters,
                },
            })
            .collect()
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Ollama does not always return call ids; missing ones are synthesised so
/// results can still be correlated.
fn parse_response(response: OllamaResponse) -> Generation {
    let requests = response
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            let id = tc
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("ollama_{}", uuid::Uuid::new_v4()));
            let arguments = match tc.function.arguments {
                serde_json::Value::String(raw) => raw,
                other => other.to_string(),
            };
            ToolRequest::from_arguments(id, tc.function.name, &arguments)
        })
        .collect();

    Generation::from_parts(response.message.content, requests)
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<Generation> {
        let ollama_request = OllamaRequest {
            model: &self.model,
            messages: Self::convert_messages(request.messages),
            tools: request
                .tools
                .filter(|t| !t.is_empty())
                .map(Self::convert_tools),
            options: OllamaOptions {
                temperature: self.temperature,
            },
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&ollama_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Ollama API error ({}): {}",
                status,
                error_text
            ));
        }

        let ollama_response: OllamaResponse = response.json().await?;
        Ok(parse_response(ollama_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ids_are_generated_and_unique() {
        let response: OllamaResponse = serde_json::from_str(
            r#"{"message":{"content":"","tool_calls":[
                {"function":{"name":"retriever_tool","arguments":{"query":"A"}}},
                {"function":{"name":"retriever_tool","arguments":{"query":"B"}}}
            ]}}"#,
        )
        .unwrap();

        let Generation::ToolRequests { requests, .. } = parse_response(response) else {
            panic!("expected tool requests");
        };
        assert_eq!(requests.len(), 2);
        assert_ne!(requests[0].id, requests[1].id);
        assert_eq!(requests[0].query, "A");
        assert_eq!(requests[1].query, "B");
    }

    #[test]
    fn text_only_is_final() {
        let response: OllamaResponse =
            serde_json::from_str(r#"{"message":{"content":"Done."}}"#).unwrap();
        assert_eq!(
            parse_response(response),
            Generation::FinalAnswer("Done.".into())
        );
    }
}
