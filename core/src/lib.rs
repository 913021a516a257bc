pub mod agent;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod providers;
pub mod store;
pub mod tools;
pub mod traits;

pub use agent::{AgentLoop, ContextBuilder, Conversation, RunSummary, ToolRegistry};
pub use config::Config;
pub use error::{AgentError, IngestError};
pub use ingest::{FeedIngestor, IngestReport};
pub use store::VectorStore;
pub use tools::RetrieverTool;
pub use traits::{
    ChatMessage, ChatRequest, Document, DocumentStore, Embedder, Generation, Provider, Tool,
    ToolRequest, ToolResult, ToolSpec,
};
