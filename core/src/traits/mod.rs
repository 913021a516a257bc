pub mod embedder;
pub mod provider;
pub mod store;
pub mod tool;

pub use embedder::Embedder;
pub use provider::{ChatMessage, ChatRequest, Generation, Provider, ToolRequest, ToolResult};
pub use store::{Document, DocumentStore};
pub use tool::{Tool, ToolSpec};
