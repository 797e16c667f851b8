//! Wire frames for the context-server channel
//!
//! Line-delimited JSON-RPC 2.0 over the subprocess's standard input/output.
//! Capability discovery uses `tools/list`, invocation uses `tools/call`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::ToolDescriptor;

/// Protocol revision sent during the handshake
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// An outgoing request frame
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest {
    jsonrpc: &'static str,
    pub id: i64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: i64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }

    /// Serialize into one newline-terminated frame
    pub fn into_line(self) -> serde_json::Result<String> {
        Ok(format!("{}\n", serde_json::to_string(&self)?))
    }
}

/// An outgoing notification frame (no response expected)
#[derive(Debug, Serialize)]
pub struct JsonRpcNotification {
    jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }

    pub fn into_line(self) -> serde_json::Result<String> {
        Ok(format!("{}\n", serde_json::to_string(&self)?))
    }
}

/// Any frame read from the subprocess
///
/// Responses carry an id and no method; server-initiated requests and
/// notifications carry a method and are ignored by this channel.
#[derive(Debug, Deserialize)]
pub struct IncomingFrame {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl IncomingFrame {
    /// Whether this frame answers one of our requests
    pub fn is_response(&self) -> bool {
        self.id.is_some() && self.method.is_none()
    }
}

/// Error object within a response frame
#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

/// Parameters of the `initialize` handshake request
pub fn initialize_params() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

/// Result of a `tools/list` request
#[derive(Debug, Deserialize)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

/// Parameters of a `tools/call` request
#[derive(Debug, Serialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// Result of a `tools/call` request
#[derive(Debug, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentSegment>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

/// One segment of a call response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSegment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Non-text fields are preserved as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentSegment {
    pub fn as_text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_frame_shape() {
        let line = JsonRpcRequest::new(3, "tools/list", Some(json!({})))
            .into_line()
            .unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["jsonrpc"], json!("2.0"));
        assert_eq!(value["id"], json!(3));
        assert_eq!(value["method"], json!("tools/list"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_notification_has_no_id() {
        let line = JsonRpcNotification::new("notifications/initialized", Some(json!({})))
            .into_line()
            .unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_incoming_response_vs_request() {
        let response: IncomingFrame =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#).unwrap();
        assert!(response.is_response());

        // An echoed or server-initiated request is not a response
        let request: IncomingFrame =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#).unwrap();
        assert!(!request.is_response());

        let notification: IncomingFrame =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/progress"}"#).unwrap();
        assert!(!notification.is_response());
    }

    #[test]
    fn test_error_frame() {
        let frame: IncomingFrame = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":4,"error":{"code":-32000,"message":"relation missing"}}"#,
        )
        .unwrap();
        assert!(frame.is_response());
        assert_eq!(frame.error.unwrap().message, "relation missing");
    }

    #[test]
    fn test_call_result_preserves_non_text_segments() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "2 rows"},
                {"type": "resource", "uri": "postgres://schema/users"}
            ]
        }))
        .unwrap();
        assert_eq!(result.content.len(), 2);
        assert_eq!(result.content[0].as_text(), Some("2 rows"));
        assert_eq!(
            result.content[1].extra.get("uri"),
            Some(&json!("postgres://schema/users"))
        );
        assert!(!result.is_error);
    }

    #[test]
    fn test_list_tools_result() {
        let result: ListToolsResult = serde_json::from_value(json!({
            "tools": [
                {"name": "list_tables", "description": "List tables", "inputSchema": {}},
                {"name": "query", "inputSchema": {"type": "object"}}
            ]
        }))
        .unwrap();
        assert_eq!(result.tools.len(), 2);
        assert_eq!(result.tools[1].name, "query");
        assert!(result.tools[1].description.is_empty());
    }
}
