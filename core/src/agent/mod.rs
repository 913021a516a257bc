pub mod context;
pub mod conversation;
pub mod loop_;
pub mod registry;

pub use context::{ContextBuilder, DEFAULT_SYSTEM_PROMPT};
pub use conversation::Conversation;
pub use loop_::{AgentLoop, LoopState, RunSummary};
pub use registry::{ToolRegistry, UNKNOWN_TOOL_MESSAGE};
