//! Tool bridge - turns advertised capabilities into callable tools
//!
//! Each discovered capability becomes one `Tool` whose invoke path always
//! produces a result for the agent loop. Validation failures and channel
//! faults alike come back as result text, never as errors, so the loop can
//! keep reasoning and the model can retry with corrected input.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::channel::ToolChannel;
use crate::core::{Result, ToolDescriptor, ToolInvocationResult, ToolRequest, ToolSignature};
use crate::tools::schema::{translate, ArgumentValidator};

/// A callable tool backed by the shared channel
pub struct Tool {
    name: String,
    description: String,
    validator: ArgumentValidator,
    channel: Arc<dyn ToolChannel>,
}

impl Tool {
    /// Build a tool from an advertised capability
    pub fn from_descriptor(descriptor: ToolDescriptor, channel: Arc<dyn ToolChannel>) -> Self {
        let validator = translate(&descriptor.name, &descriptor.input_schema);
        let description = if descriptor.description.is_empty() {
            format!("Tool {}", descriptor.name)
        } else {
            descriptor.description
        };
        Self {
            name: descriptor.name,
            description,
            validator,
            channel,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn validator(&self) -> &ArgumentValidator {
        &self.validator
    }

    /// Signature presented to the model
    pub fn signature(&self) -> ToolSignature {
        let properties: serde_json::Map<String, Value> = self
            .validator
            .rules()
            .iter()
            .map(|rule| {
                (
                    rule.name.clone(),
                    json!({
                        "type": declared_type(rule.kind),
                        "description": rule.description,
                    }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .validator
            .rules()
            .iter()
            .filter(|rule| rule.required)
            .map(|rule| rule.name.as_str())
            .collect();

        ToolSignature::new(
            self.name.as_str(),
            self.description.as_str(),
            json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        )
    }

    /// Resolve one tool request into exactly one result
    ///
    /// Arguments are validated before anything reaches the channel; a
    /// rejected call never leaves the process.
    pub async fn resolve(&self, request: &ToolRequest) -> ToolInvocationResult {
        let validated = match self.validator.validate(&request.arguments) {
            Ok(validated) => validated,
            Err(e) => return ToolInvocationResult::error(&request.id, e.to_string()),
        };

        match self.channel.invoke(&self.name, Value::Object(validated)).await {
            Ok(payload) => ToolInvocationResult::ok(&request.id, payload),
            Err(e) => ToolInvocationResult::error(
                &request.id,
                format!("Error executing tool {}: {}", self.name, e),
            ),
        }
    }
}

fn declared_type(kind: crate::tools::schema::ArgumentKind) -> &'static str {
    use crate::tools::schema::ArgumentKind;
    match kind {
        ArgumentKind::Text => "string",
        ArgumentKind::Integer => "integer",
        ArgumentKind::Number => "number",
        ArgumentKind::Boolean => "boolean",
        ArgumentKind::List => "array",
        ArgumentKind::Map => "object",
    }
}

/// Build one tool per capability advertised on the channel
pub async fn build_tools(channel: Arc<dyn ToolChannel>) -> Result<Vec<Tool>> {
    let descriptors = channel.list_capabilities().await?;
    Ok(descriptors
        .into_iter()
        .map(|descriptor| Tool::from_descriptor(descriptor, Arc::clone(&channel)))
        .collect())
}
