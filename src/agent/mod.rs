//! LLM agent that answers infrastructure questions with tool calling.
//!
//! The agent keeps a message history per conversation thread, lets the model
//! invoke the registered tools one call at a time, and streams the final
//! answer back in fixed-size chunks.

mod memory;
mod model;
mod runner;
mod stream;

pub use memory::{trim_history, ConversationStore, Thread, ThreadSummary};
pub use model::{ChatModel, OpenAiChatModel};
pub use runner::{Agent, AgentResponse, ToolCallRecord};
pub use stream::{chunk_response, response_stream, split_chunks};

#[cfg(test)]
pub(crate) use runner::tests as testing;
