use crate::agent::{ContextBuilder, Conversation, ToolRegistry};
use crate::error::AgentError;
use crate::traits::{ChatMessage, ChatRequest, Generation, Provider, ToolSpec};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Generating,
    ExecutingTools,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub answer: String,
    /// Number of generation calls made.
    pub iterations: usize,
    pub tool_calls: usize,
}

/// Alternates generation and tool execution until the model answers without
/// requesting tools.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    context_builder: ContextBuilder,
    tool_registry: Arc<ToolRegistry>,
    max_iterations: Option<usize>,
    generation_timeout: Option<Duration>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        context_builder: ContextBuilder,
        tool_registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            provider,
            context_builder,
            tool_registry,
            max_iterations: None,
            generation_timeout: None,
        }
    }

    /// Caps the number of generation calls per question.
    pub fn with_max_iterations(mut self, max: Option<usize>) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = Some(timeout);
        self
    }

    pub fn tool_registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    pub fn context_builder(&self) -> &ContextBuilder {
        &self.context_builder
    }

    pub async fn invoke(&self, question: &str) -> Result<String, AgentError> {
        let mut conversation = self.context_builder.build_conversation(question);
        let summary = self.run(&mut conversation).await?;
        Ok(summary.answer)
    }

    /// Drives `conversation` to a final answer. On error the conversation keeps
    /// every message committed so far; an assistant turn is only appended after
    /// generation succeeds, and its tool results are appended as a full batch.
    pub async fn run(&self, conversation: &mut Conversation) -> Result<RunSummary, AgentError> {
        let specs = self.tool_registry.specs();
        let mut state = LoopState::Generating;
        let mut iterations = 0;
        let mut tool_calls = 0;
        let mut answer = String::new();

        loop {
            debug!(?state, iterations, messages = conversation.len(), "Agent loop step");

            match state {
                LoopState::Generating => {
                    if let Some(max) = self.max_iterations
                        && iterations >= max
                    {
                        return Err(AgentError::LoopExceeded { iterations });
                    }
                    iterations += 1;

                    let generation = self.generate(conversation.messages(), &specs).await?;
                    state = match &generation {
                        Generation::ToolRequests { requests, .. } if !requests.is_empty() => {
                            debug!(requests = requests.len(), "Model requested tools");
                            LoopState::ExecutingTools
                        }
                        Generation::FinalAnswer(text) | Generation::ToolRequests { text, .. } => {
                            answer = text.clone();
                            LoopState::Done
                        }
                    };
                    conversation.push(generation.into_message());
                }
                LoopState::ExecutingTools => {
                    let requests = match conversation.last() {
                        Some(message) => message.tool_requests().to_vec(),
                        None => Vec::new(),
                    };

                    // One at a time, in the order the model emitted them.
                    let mut results = Vec::with_capacity(requests.len());
                    for request in &requests {
                        results.push(self.tool_registry.execute(request).await);
                    }

                    tool_calls += results.len();
                    for result in results {
                        conversation.push(ChatMessage::tool_result(result));
                    }
                    info!("Tools Execution Complete. Back to the model!");
                    state = LoopState::Generating;
                }
                LoopState::Done => {
                    return Ok(RunSummary {
                        answer,
                        iterations,
                        tool_calls,
                    });
                }
            }
        }
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        specs: &[ToolSpec],
    ) -> Result<Generation, AgentError> {
        let request = ChatRequest {
            messages,
            tools: if specs.is_empty() { None } else { Some(specs) },
        };

        let outcome = match self.generation_timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.chat(request))
                .await
                .map_err(|_| AgentError::GenerationTimeout(limit))?,
            None => self.provider.chat(request).await,
        };

        outcome.map_err(AgentError::Generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::UNKNOWN_TOOL_MESSAGE;
    use crate::store::VectorStore;
    use crate::tools::{NO_RESULTS, RETRIEVER_TOOL_NAME, RetrieverTool};
    use crate::traits::{Embedder, Tool, ToolRequest};
    use async_trait::async_trait;
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;

    /// Replays scripted generations and records the history it was shown.
    struct ScriptedProvider {
        script: Mutex<VecDeque<anyhow::Result<Generation>>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<anyhow::Result<Generation>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<Generation> {
            self.seen.lock().unwrap().push(request.messages.to_vec());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("script exhausted")))
        }
    }

    /// Always asks for another lookup.
    struct RelentlessProvider;

    #[async_trait]
    impl Provider for RelentlessProvider {
        fn name(&self) -> &str {
            "relentless"
        }

        async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<Generation> {
            let n = request.messages.len();
            Ok(tool_call(&format!("call_{n}"), RETRIEVER_TOOL_NAME, "more"))
        }
    }

    struct StalledProvider;

    #[async_trait]
    impl Provider for StalledProvider {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn chat(&self, _request: ChatRequest<'_>) -> anyhow::Result<Generation> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Generation::FinalAnswer("too late".into()))
        }
    }

    /// Echoes queries; queries listed in `slow` take longer to answer.
    struct LookupTool {
        slow: HashSet<String>,
        executed: Mutex<Vec<String>>,
    }

    impl LookupTool {
        fn new(slow: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                slow: slow.iter().map(|s| s.to_string()).collect(),
                executed: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Tool for LookupTool {
        fn name(&self) -> &str {
            RETRIEVER_TOOL_NAME
        }

        fn description(&self) -> &str {
            "Looks things up"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}}})
        }

        async fn execute(&self, query: &str) -> anyhow::Result<String> {
            if self.slow.contains(query) {
                tokio::time::sleep(Duration::from_millis(40)).await;
            }
            self.executed.lock().unwrap().push(query.to_string());
            if query == "explode" {
                return Err(anyhow::anyhow!("lookup backend crashed"));
            }
            Ok(format!("articles about {query}"))
        }
    }

    fn tool_call(id: &str, name: &str, query: &str) -> Generation {
        Generation::ToolRequests {
            text: String::new(),
            requests: vec![ToolRequest::new(id, name, query)],
        }
    }

    fn answer(text: &str) -> anyhow::Result<Generation> {
        Ok(Generation::FinalAnswer(text.into()))
    }

    fn agent(provider: Arc<dyn Provider>, tool: Arc<dyn Tool>) -> AgentLoop {
        let registry = Arc::new(ToolRegistry::new().with_tool(tool));
        AgentLoop::new(provider, ContextBuilder::new(), registry)
    }

    /// Every request of every assistant turn is answered exactly once, in
    /// order, before the next assistant turn.
    fn assert_requests_answered(conversation: &Conversation) {
        let messages = conversation.messages();
        for (i, message) in messages.iter().enumerate() {
            let requests = message.tool_requests();
            if requests.is_empty() {
                continue;
            }
            let results: Vec<_> = messages[i + 1..]
                .iter()
                .take_while(|m| matches!(m, ChatMessage::Tool(_)))
                .map(|m| match m {
                    ChatMessage::Tool(r) => r.id.as_str(),
                    _ => unreachable!(),
                })
                .collect();
            let ids: Vec<_> = requests.iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, results);
        }
    }

    #[tokio::test]
    async fn single_lookup_then_answer() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_call("call_1", RETRIEVER_TOOL_NAME, "X")),
            answer("The article about X said Y."),
        ]);
        let tool = LookupTool::new(&[]);
        let agent = agent(provider.clone(), tool.clone());

        let mut conversation =
            ContextBuilder::new().build_conversation("What did the article about X say?");
        let summary = agent.run(&mut conversation).await.unwrap();

        assert_eq!(summary.answer, "The article about X said Y.");
        assert_eq!(summary.iterations, 2);
        assert_eq!(summary.tool_calls, 1);
        assert_eq!(provider.calls(), 2);
        assert_eq!(*tool.executed.lock().unwrap(), vec!["X"]);

        let roles: Vec<_> = conversation.messages().iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool", "assistant"]);
        assert_requests_answered(&conversation);

        // The second generation saw the tool result.
        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[1].last().unwrap().content(), "articles about X");
    }

    #[tokio::test]
    async fn direct_answer_runs_no_tools() {
        let provider = ScriptedProvider::new(vec![answer("Hello.")]);
        let tool = LookupTool::new(&[]);
        let agent = agent(provider.clone(), tool.clone());

        let mut conversation = agent.context_builder().build_conversation("hi");
        let summary = agent.run(&mut conversation).await.unwrap();

        assert_eq!(summary.iterations, 1);
        assert_eq!(summary.tool_calls, 0);
        assert!(tool.executed.lock().unwrap().is_empty());
        assert_eq!(conversation.len(), 3);
    }

    #[tokio::test]
    async fn empty_request_batch_is_a_final_answer() {
        let provider = ScriptedProvider::new(vec![
            Ok(Generation::ToolRequests {
                text: "thinking".into(),
                requests: vec![],
            }),
            answer("second"),
        ]);
        let tool = LookupTool::new(&[]);
        let agent = agent(provider.clone(), tool.clone());

        let mut conversation = agent.context_builder().build_conversation("hi");
        let summary = agent.run(&mut conversation).await.unwrap();

        assert_eq!(summary.iterations, 1);
        assert_eq!(summary.tool_calls, 0);
        assert_eq!(summary.answer, "thinking");
        assert_eq!(provider.calls(), 1);
        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation.last_answer(), Some("thinking"));
    }

    #[tokio::test]
    async fn results_follow_request_order_not_latency() {
        let provider = ScriptedProvider::new(vec![
            Ok(Generation::ToolRequests {
                text: "Looking up both.".into(),
                requests: vec![
                    ToolRequest::new("call_a", RETRIEVER_TOOL_NAME, "A"),
                    ToolRequest::new("call_b", RETRIEVER_TOOL_NAME, "B"),
                ],
            }),
            answer("Both found."),
        ]);
        let tool = LookupTool::new(&["A"]);
        let agent = agent(provider, tool.clone());

        let mut conversation = agent.context_builder().build_conversation("A and B?");
        agent.run(&mut conversation).await.unwrap();

        let results: Vec<_> = conversation
            .messages()
            .iter()
            .filter_map(|m| match m {
                ChatMessage::Tool(r) => Some((r.id.as_str(), r.content.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            results,
            vec![("call_a", "articles about A"), ("call_b", "articles about B")]
        );
        assert_eq!(*tool.executed.lock().unwrap(), vec!["A", "B"]);
        assert_requests_answered(&conversation);
    }

    #[tokio::test]
    async fn generation_failure_commits_nothing() {
        let provider = ScriptedProvider::new(vec![Err(anyhow::anyhow!("401 unauthorized"))]);
        let tool = LookupTool::new(&[]);
        let agent = agent(provider, tool.clone());

        let mut conversation = agent.context_builder().build_conversation("q");
        let err = agent.run(&mut conversation).await.unwrap_err();

        assert!(err.is_generation_failure());
        assert!(err.to_string().contains("401 unauthorized"));
        assert_eq!(conversation.len(), 2);
        assert!(tool.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_the_model() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_call("call_1", "web_search", "X")),
            Ok(tool_call("call_2", RETRIEVER_TOOL_NAME, "X")),
            answer("Recovered."),
        ]);
        let tool = LookupTool::new(&[]);
        let agent = agent(provider, tool);

        let mut conversation = agent.context_builder().build_conversation("q");
        let summary = agent.run(&mut conversation).await.unwrap();

        assert_eq!(summary.answer, "Recovered.");
        assert_eq!(summary.iterations, 3);
        assert_eq!(conversation.messages()[3].content(), UNKNOWN_TOOL_MESSAGE);
        assert_requests_answered(&conversation);
    }

    #[tokio::test]
    async fn tool_errors_do_not_stop_the_loop() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_call("call_1", RETRIEVER_TOOL_NAME, "explode")),
            answer("Sorry, the lookup failed."),
        ]);
        let agent = agent(provider, LookupTool::new(&[]));

        let mut conversation = agent.context_builder().build_conversation("q");
        let summary = agent.run(&mut conversation).await.unwrap();

        assert_eq!(summary.answer, "Sorry, the lookup failed.");
        assert!(conversation.messages()[3].content().contains("lookup backend crashed"));
    }

    #[tokio::test]
    async fn iteration_guard_trips_with_all_requests_answered() {
        let agent = agent(Arc::new(RelentlessProvider), LookupTool::new(&[]))
            .with_max_iterations(Some(3));

        let mut conversation = agent.context_builder().build_conversation("q");
        let err = agent.run(&mut conversation).await.unwrap_err();

        assert!(matches!(err, AgentError::LoopExceeded { iterations: 3 }));
        assert!(!err.is_generation_failure());
        assert!(conversation.unanswered_requests().is_empty());
        assert_requests_answered(&conversation);
        // system + user + 3 * (assistant + tool)
        assert_eq!(conversation.len(), 8);
    }

    #[tokio::test]
    async fn generation_timeout_is_a_generation_failure() {
        let agent = agent(Arc::new(StalledProvider), LookupTool::new(&[]))
            .with_generation_timeout(Duration::from_millis(50));

        let mut conversation = agent.context_builder().build_conversation("q");
        let err = agent.run(&mut conversation).await.unwrap_err();

        assert!(matches!(err, AgentError::GenerationTimeout(_)));
        assert!(err.is_generation_failure());
        assert_eq!(conversation.len(), 2);
    }

    #[tokio::test]
    async fn invoke_returns_final_text() {
        let provider = ScriptedProvider::new(vec![answer("42")]);
        let agent = agent(provider, LookupTool::new(&[]));
        assert_eq!(agent.invoke("meaning?").await.unwrap(), "42");
    }

    struct ZeroEmbedder;

    #[async_trait]
    impl Embedder for ZeroEmbedder {
        fn name(&self) -> &str {
            "zero"
        }

        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
        }
    }

    #[tokio::test]
    async fn empty_index_yields_no_results_sentinel() {
        let store = Arc::new(VectorStore::in_memory("rss_data", Arc::new(ZeroEmbedder)));
        let provider = ScriptedProvider::new(vec![
            Ok(tool_call("call_1", RETRIEVER_TOOL_NAME, "anything")),
            answer("Nothing in the articles covers that."),
        ]);
        let agent = agent(provider, Arc::new(RetrieverTool::new(store)));

        let mut conversation = agent.context_builder().build_conversation("q");
        agent.run(&mut conversation).await.unwrap();

        assert_eq!(conversation.messages()[3].content(), NO_RESULTS);
    }
}
