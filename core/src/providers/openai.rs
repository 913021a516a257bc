use crate::traits::{ChatMessage, ChatRequest, Generation, Provider, ToolRequest, ToolSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool<'a>>>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCallRequest<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCallRequest<'a> {
    id: &'a str,
    r#type: &'a str,
    function: OpenAIFunctionRequest<'a>,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionRequest<'a> {
    name: &'a str,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAITool<'a> {
    r#type: &'a str,
    function: OpenAIToolFunction<'a>,
}

#[derive(Debug, Serialize)]
struct OpenAIToolFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunction {
    name: String,
    arguments: String,
}

pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f64,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.0,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    fn convert_messages<'a>(&self, messages: &'a [ChatMessage]) -> Vec<OpenAIMessage<'a>> {
        messages
            .iter()
            .map(|m| {
                let tool_calls = match m {
                    ChatMessage::Assistant { tool_requests, .. } if !tool_requests.is_empty() => {
                        Some(
                            tool_requests
                                .iter()
                                .map(|tr| OpenAIToolCallRequest {
                                    id: &tr.id,
                                    r#type: "function",
                                    function: OpenAIFunctionRequest {
                                        name: &tr.name,
                                        arguments: tr.arguments(),
                                    },
                                })
                                .collect(),
                        )
                    }
                    _ => None,
                };

                let tool_call_id = match m {
                    ChatMessage::Tool(result) => Some(result.id.as_str()),
                    _ => None,
                };

                OpenAIMessage {
                    role: m.role(),
                    content: Some(m.content()),
                    tool_calls,
                    tool_call_id,
                }
            })
            .collect()
    }

    fn convert_tools<'a>(&self, tools: &'a [ToolSpec]) -> Vec<OpenAITool<'a>> {
        tools
            .iter()
            .map(|t| OpenAITool {
                r#type: "function",
                function: OpenAIToolFunction {
                    name: &t.name,
                    description: &t.description,
                    parameters: &t.parameters,
                },
            })
            .collect()
    }
}

fn parse_response(response: OpenAIResponse) -> anyhow::Result<Generation> {
    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No choices in response"))?
        .message;

    let requests: Vec<ToolRequest> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|c| ToolRequest::from_arguments(c.id, c.function.name, &c.function.arguments))
        .collect();

    let has_content = message
        .content
        .as_ref()
        .is_some_and(|c| !c.trim().is_empty());
    if !has_content && requests.is_empty() {
        return Err(anyhow::anyhow!(
            "Empty response from API: no content or tool calls"
        ));
    }

    Ok(Generation::from_parts(message.content, requests))
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<Generation> {
        let openai_request = OpenAIRequest {
            model: &self.model,
            messages: self.convert_messages(request.messages),
            temperature: self.temperature,
            tools: request
                .tools
                .filter(|t| !t.is_empty())
                .map(|t| self.convert_tools(t)),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "OpenAI API error {}: {}",
                status,
                error_text
            ));
        }

        let openai_response: OpenAIResponse = response.json().await?;
        parse_response(openai_response)
    }
}
