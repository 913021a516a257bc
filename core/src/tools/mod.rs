pub mod retriever;

pub use retriever::{NO_RESULTS, RETRIEVER_TOOL_NAME, RetrieverTool};
