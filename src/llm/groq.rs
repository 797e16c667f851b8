//! Groq client implementation
//!
//! Async HTTP client for Groq's OpenAI-compatible chat completions API with
//! tool calling support.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::core::{Config, DatalystError, Message, Result, Role, ToolRequest, ToolSignature};
use crate::llm::traits::{ModelProvider, ModelReply};

/// Groq API client
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

/// Chat completions request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
    temperature: f32,
}

/// Message in the provider's wire format
#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// Tool call in the provider's wire format; arguments travel as a JSON string
#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSignature,
}

/// Chat completions response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

impl GroqClient {
    /// Create a client from configuration
    ///
    /// A missing `GROQ_API_KEY` is a fatal startup condition.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = env::var("GROQ_API_KEY")
            .map_err(|_| DatalystError::config("GROQ_API_KEY must be set"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.model.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.model.base_url.clone(),
            api_key,
            model: config.model.name.clone(),
            temperature: config.model.temperature,
        })
    }

    /// Create a client with explicit credentials
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        }
    }

    /// Convert internal messages to the provider's wire format
    fn to_wire_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|message| match message.role {
                Role::System => WireMessage {
                    role: "system",
                    content: Some(message.content.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                },
                Role::User => WireMessage {
                    role: "user",
                    content: Some(message.content.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                },
                Role::Assistant => WireMessage {
                    role: "assistant",
                    content: Some(message.content.clone()),
                    tool_calls: if message.tool_requests.is_empty() {
                        None
                    } else {
                        Some(
                            message
                                .tool_requests
                                .iter()
                                .map(|request| WireToolCall {
                                    id: Some(request.id.clone()),
                                    kind: "function".to_string(),
                                    function: WireFunction {
                                        name: request.tool_name.clone(),
                                        arguments: serde_json::Value::Object(
                                            request.arguments.clone(),
                                        )
                                        .to_string(),
                                    },
                                })
                                .collect(),
                        )
                    },
                    tool_call_id: None,
                },
                Role::Tool => WireMessage {
                    role: "tool",
                    content: Some(message.content.clone()),
                    tool_calls: None,
                    tool_call_id: message.tool_request_id.clone(),
                },
            })
            .collect()
    }

    /// Convert a provider response to a model reply
    fn to_model_reply(response: ChatResponse) -> Result<ModelReply> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DatalystError::model("response carried no choices"))?;

        let tool_requests = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                // An arguments string that fails to parse degrades to an
                // empty map; the validator then reports what is missing as
                // tool-result text instead of faulting the loop.
                let arguments: Map<String, serde_json::Value> =
                    serde_json::from_str(&call.function.arguments).unwrap_or_default();
                ToolRequest::new(
                    call.id
                        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4())),
                    call.function.name,
                    arguments,
                )
            })
            .collect();

        Ok(ModelReply {
            content: choice.message.content.unwrap_or_default(),
            tool_requests,
        })
    }
}

#[async_trait]
impl ModelProvider for GroqClient {
    async fn complete(&self, messages: &[Message], tools: &[ToolSignature]) -> Result<ModelReply> {
        let wire_tools: Vec<WireTool> = tools
            .iter()
            .map(|signature| WireTool {
                kind: "function",
                function: signature,
            })
            .collect();

        let request = ChatRequest {
            model: &self.model,
            messages: Self::to_wire_messages(messages),
            tools: if wire_tools.is_empty() {
                None
            } else {
                Some(wire_tools)
            },
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    DatalystError::model(format!(
                        "Cannot connect to the model API at {}",
                        self.base_url
                    ))
                } else {
                    DatalystError::from(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DatalystError::model(format!(
                "model API returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        Self::to_model_reply(parsed)
    }

    fn name(&self) -> &str {
        "groq"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_message_maps_to_tool_role() {
        let messages = vec![
            Message::system("be helpful"),
            Message::tool_result("call_1", "3 rows"),
        ];
        let wire = GroqClient::to_wire_messages(&messages);
        assert_eq!(wire[1].role, "tool");
        assert_eq!(wire[1].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_assistant_tool_requests_serialize_arguments_as_string() {
        let mut arguments = Map::new();
        arguments.insert("sql".to_string(), json!("select 1"));
        let message = Message::assistant_with_requests(
            "",
            vec![ToolRequest::new("call_1", "query", arguments)],
        );

        let wire = GroqClient::to_wire_messages(&[message]);
        let calls = wire[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "query");
        assert_eq!(calls[0].function.arguments, r#"{"sql":"select 1"}"#);
    }

    #[test]
    fn test_response_with_tool_calls_parses_arguments() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "list_tables", "arguments": "{}"}
                    }]
                }
            }]
        }))
        .unwrap();

        let reply = GroqClient::to_model_reply(response).unwrap();
        assert!(reply.content.is_empty());
        assert_eq!(reply.tool_requests.len(), 1);
        assert_eq!(reply.tool_requests[0].tool_name, "list_tables");
        assert_eq!(reply.tool_requests[0].id, "call_9");
    }

    #[test]
    fn test_unparsable_arguments_degrade_to_empty_map() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "query", "arguments": "select * from"}
                    }]
                }
            }]
        }))
        .unwrap();

        let reply = GroqClient::to_model_reply(response).unwrap();
        assert!(reply.tool_requests[0].arguments.is_empty());
    }

    #[test]
    fn test_empty_choices_is_a_model_error() {
        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(
            GroqClient::to_model_reply(response),
            Err(DatalystError::Model(_))
        ));
    }
}
