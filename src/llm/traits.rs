//! Model provider trait for abstracting hosted backends
//!
//! The agent loop sees the model as an opaque capability: it takes the
//! message history plus the callable tool signatures and returns either a
//! final answer or a list of requested tool invocations.

use async_trait::async_trait;

use crate::core::{Message, Result, ToolRequest, ToolSignature};

/// Response from a model provider
#[derive(Debug, Clone)]
pub struct ModelReply {
    /// Text content of the response
    pub content: String,
    /// Tool invocations the model wants to make
    pub tool_requests: Vec<ToolRequest>,
}

impl ModelReply {
    /// A reply that terminates the loop
    pub fn answer(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_requests: Vec::new(),
        }
    }

    /// A reply requesting tool invocations
    pub fn with_requests(content: impl Into<String>, requests: Vec<ToolRequest>) -> Self {
        Self {
            content: content.into(),
            tool_requests: requests,
        }
    }
}

/// Trait for model providers
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Produce the next assistant turn for the given history and tool set
    async fn complete(&self, messages: &[Message], tools: &[ToolSignature]) -> Result<ModelReply>;

    /// Get the provider name
    fn name(&self) -> &str;
}
