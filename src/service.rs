//! Request/response boundary
//!
//! The surface consumed by the HTTP and CLI front ends: accept a user
//! message with an optional thread id, run the agent loop against that
//! thread's history, and return the final answer plus any structured data
//! from the last tool result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::agent::{AgentLoop, ConversationStore};
use crate::channel::{StdioChannel, ToolChannel};
use crate::core::{Config, Message, Result};
use crate::llm::{GroqClient, ModelProvider};
use crate::tools::build_tools;

/// A chat request from a front end
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// User message text
    pub message: String,
    /// Thread to continue; generated when absent
    #[serde(default)]
    pub thread_id: Option<String>,
}

impl ChatRequest {
    /// Create a request continuing the given thread
    pub fn new(message: impl Into<String>, thread_id: Option<String>) -> Self {
        Self {
            message: message.into(),
            thread_id,
        }
    }
}

/// A completed chat response
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// Final answer text
    pub answer: String,
    /// Structured data from the last tool result, when any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Thread id the conversation continues under
    pub thread_id: String,
}

/// Boundary error surface for the front ends
///
/// `Unavailable` maps to a service-unavailable condition when a wrapper has
/// no initialized service yet; `Internal` carries the description of an
/// unrecoverable loop fault.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("agent is not initialized")]
    Unavailable,

    #[error("{0}")]
    Internal(String),
}

/// The started application: channel, tools, loop, and store in one place
///
/// Constructed once at startup and passed by reference to every front end.
pub struct AgentService {
    agent_loop: AgentLoop,
    store: ConversationStore,
    channel: Arc<dyn ToolChannel>,
}

impl AgentService {
    /// Run the startup sequence: connect the channel, discover tools, and
    /// bind the agent loop
    ///
    /// The channel is torn down again when any later step fails, so a
    /// partial startup never leaks the subprocess.
    pub async fn start(config: &Config) -> Result<Self> {
        let channel = StdioChannel::from_config(config);
        channel.connect().await?;
        let channel: Arc<dyn ToolChannel> = Arc::new(channel);

        let tools = match build_tools(Arc::clone(&channel)).await {
            Ok(tools) => tools,
            Err(e) => {
                let _ = channel.cleanup().await;
                return Err(e);
            }
        };

        let model = match GroqClient::from_config(config) {
            Ok(model) => Arc::new(model) as Arc<dyn ModelProvider>,
            Err(e) => {
                let _ = channel.cleanup().await;
                return Err(e);
            }
        };
        tracing::info!(tools = tools.len(), "agent initialized");

        Ok(Self::assemble(model, tools, channel, config))
    }

    /// Assemble a service from already-built parts
    pub fn assemble(
        model: Arc<dyn ModelProvider>,
        tools: Vec<crate::tools::Tool>,
        channel: Arc<dyn ToolChannel>,
        config: &Config,
    ) -> Self {
        Self {
            agent_loop: AgentLoop::new(model, tools, &config.agent),
            store: ConversationStore::new(config.store.capacity),
            channel,
        }
    }

    /// Handle one chat request
    pub async fn handle(&self, request: ChatRequest) -> std::result::Result<ChatResponse, ChatError> {
        let thread_id = request
            .thread_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut conversation = self.store.get(&thread_id);
        conversation.push_user(request.message);

        let conversation = self
            .agent_loop
            .run(conversation)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?;

        let answer = conversation
            .last_assistant()
            .map(|message| message.content.clone())
            .ok_or_else(|| ChatError::Internal("agent produced no answer".to_string()))?;
        let data = conversation.last_tool_result().map(extract_data);

        self.store.put(&thread_id, conversation);

        Ok(ChatResponse {
            answer,
            data,
            thread_id,
        })
    }

    /// Names of the discovered tools
    pub fn tool_names(&self) -> Vec<&str> {
        self.agent_loop.tool_names()
    }

    /// Close the channel and terminate the context server
    pub async fn shutdown(&self) -> Result<()> {
        self.channel.cleanup().await
    }
}

/// Pull structured data out of a tool-result message
///
/// Prefers the structured payload; otherwise tries to parse the text as
/// JSON, falling back to the raw text.
fn extract_data(message: &Message) -> Value {
    if let Some(data) = &message.data {
        return data.clone();
    }
    serde_json::from_str(&message.content)
        .unwrap_or_else(|_| Value::String(message.content.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_data_parses_json_text() {
        let message = Message::tool_result("call_1", r#"["users","orders"]"#);
        assert_eq!(extract_data(&message), serde_json::json!(["users", "orders"]));
    }

    #[test]
    fn test_extract_data_falls_back_to_raw_text() {
        let message = Message::tool_result("call_1", "no rows found");
        assert_eq!(
            extract_data(&message),
            Value::String("no rows found".to_string())
        );
    }

    #[test]
    fn test_extract_data_prefers_structured_payload() {
        let message = Message::tool_result("call_1", "ignored")
            .with_data(serde_json::json!({"rows": 3}));
        assert_eq!(extract_data(&message), serde_json::json!({"rows": 3}));
    }

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::Unavailable.to_string(), "agent is not initialized");
        assert_eq!(ChatError::Internal("boom".to_string()).to_string(), "boom");
    }
}
