//! Shared types used across Datalyst modules
//!
//! Contains the conversation data model, tool descriptors, and invocation results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the whole conversation
    System,
    /// End-user input
    User,
    /// Model output, possibly carrying tool requests
    Assistant,
    /// Result of one resolved tool request
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A message in a conversation
///
/// Immutable once created. `tool_requests` is only populated on assistant
/// messages; `tool_request_id` only on tool-result messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
    /// Tool invocations requested by the assistant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_requests: Vec<ToolRequest>,
    /// Id of the request this tool-result message resolves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_request_id: Option<String>,
    /// Structured payload carried alongside a tool-result message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_requests: Vec::new(),
            tool_request_id: None,
            data: None,
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_requests: Vec::new(),
            tool_request_id: None,
            data: None,
        }
    }

    /// Create a new assistant message with no tool requests
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::assistant_with_requests(content, Vec::new())
    }

    /// Create an assistant message carrying tool requests
    pub fn assistant_with_requests(content: impl Into<String>, requests: Vec<ToolRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_requests: requests,
            tool_request_id: None,
            data: None,
        }
    }

    /// Create a tool-result message resolving the given request id
    pub fn tool_result(request_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_requests: Vec::new(),
            tool_request_id: Some(request_id.into()),
            data: None,
        }
    }

    /// Attach structured data to this message
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Whether this message terminates an agent run
    pub fn is_final_answer(&self) -> bool {
        self.role == Role::Assistant && self.tool_requests.is_empty()
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Request id, unique within a conversation
    pub id: String,
    /// Name of the tool to invoke
    pub tool_name: String,
    /// Arguments keyed by parameter name
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolRequest {
    /// Create a new tool request
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// A capability advertised by the context server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Name, unique within a channel
    pub name: String,
    /// Human-readable description shown to the model
    #[serde(default)]
    pub description: String,
    /// JSON-Schema-like parameter declaration
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// Signature of a callable tool as presented to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSignature {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: Value,
}

impl ToolSignature {
    /// Create a new tool signature
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Payload returned by a capability invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolPayload {
    /// A single text segment, returned verbatim
    Text(String),
    /// Anything else, returned as raw structured data
    Data(Value),
}

impl ToolPayload {
    /// Render the payload as text for inclusion in the conversation
    pub fn render(&self) -> String {
        match self {
            ToolPayload::Text(text) => text.clone(),
            ToolPayload::Data(value) => value.to_string(),
        }
    }

    /// Structured data, when this payload carries any
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            ToolPayload::Text(_) => None,
            ToolPayload::Data(value) => Some(value),
        }
    }
}

/// Outcome of resolving one tool request
#[derive(Debug, Clone)]
pub struct ToolInvocationResult {
    /// Id of the request this result resolves
    pub tool_request_id: String,
    /// Result payload, error text included
    pub payload: ToolPayload,
    /// Whether the payload describes a failure
    pub is_error: bool,
}

impl ToolInvocationResult {
    /// Create a successful result
    pub fn ok(request_id: impl Into<String>, payload: ToolPayload) -> Self {
        Self {
            tool_request_id: request_id.into(),
            payload,
            is_error: false,
        }
    }

    /// Create an error result whose text is surfaced to the model
    pub fn error(request_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_request_id: request_id.into(),
            payload: ToolPayload::Text(text.into()),
            is_error: true,
        }
    }

    /// Convert into the tool-result message appended to the conversation
    pub fn into_message(self) -> Message {
        let message = Message::tool_result(self.tool_request_id, self.payload.render());
        match self.payload {
            ToolPayload::Data(value) => message.with_data(value),
            ToolPayload::Text(_) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_final_answer() {
        assert!(Message::assistant("done").is_final_answer());
        let request = ToolRequest::new("call_1", "list_tables", Map::new());
        assert!(!Message::assistant_with_requests("", vec![request]).is_final_answer());
        assert!(!Message::user("hi").is_final_answer());
    }

    #[test]
    fn test_tool_result_message_carries_request_id() {
        let message = Message::tool_result("call_7", "3 rows");
        assert_eq!(message.role, Role::Tool);
        assert_eq!(message.tool_request_id.as_deref(), Some("call_7"));
    }

    #[test]
    fn test_invocation_result_into_message() {
        let payload = ToolPayload::Data(json!(["users", "orders"]));
        let message = ToolInvocationResult::ok("call_1", payload).into_message();
        assert_eq!(message.content, r#"["users","orders"]"#);
        assert_eq!(message.data, Some(json!(["users", "orders"])));

        let message = ToolInvocationResult::error("call_2", "no such tool: drop_db").into_message();
        assert_eq!(message.content, "no such tool: drop_db");
        assert!(message.data.is_none());
    }

    #[test]
    fn test_descriptor_deserializes_input_schema() {
        let descriptor: ToolDescriptor = serde_json::from_value(json!({
            "name": "query",
            "description": "Run a SQL query",
            "inputSchema": {
                "type": "object",
                "properties": {"sql": {"type": "string"}},
                "required": ["sql"]
            }
        }))
        .unwrap();
        assert_eq!(descriptor.name, "query");
        assert!(descriptor.input_schema["properties"]["sql"].is_object());
    }
}
