//! Datalyst - Natural-Language Data Analyst
//!
//! Users ask questions about a database in plain language; an agent loop
//! answers them by iteratively calling tools advertised at runtime by an
//! MCP context-server subprocess.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **Channel**: Subprocess lifecycle and JSON-RPC stdio framing
//! - **Tools**: Schema translation and the dynamic tool bridge
//! - **LLM**: Model provider abstraction with Groq as the backend
//! - **Agent**: The reasoning loop, conversation history, and thread store
//! - **Service**: Request/response boundary for HTTP and CLI front ends
//! - **CLI**: Interactive REPL

pub mod agent;
pub mod channel;
pub mod cli;
pub mod core;
pub mod llm;
pub mod service;
pub mod tools;

// Re-export commonly used items
pub use crate::agent::{AgentLoop, Conversation, ConversationStore};
pub use crate::channel::{StdioChannel, ToolChannel};
pub use crate::core::{Config, DatalystError, Result};
pub use crate::service::{AgentService, ChatError, ChatRequest, ChatResponse};
