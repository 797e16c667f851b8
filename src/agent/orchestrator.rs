//! Agent loop
//!
//! Drives a conversation to completion: feed the history and the tool set to
//! the model, dispatch whatever tools it requests, append the results, and
//! repeat until the model answers without requesting more.

use std::sync::Arc;

use crate::agent::conversation::Conversation;
use crate::agent::loop_state::{LoopState, TurnBudget};
use crate::agent::prompt::SYSTEM_PROMPT;
use crate::core::config::AgentConfig;
use crate::core::{DatalystError, Message, Result, ToolInvocationResult, ToolRequest, ToolSignature};
use crate::llm::ModelProvider;
use crate::tools::Tool;

/// The tool-calling agent loop
pub struct AgentLoop {
    model: Arc<dyn ModelProvider>,
    tools: Vec<Tool>,
    signatures: Vec<ToolSignature>,
    system_prompt: String,
    max_turns: usize,
}

impl AgentLoop {
    /// Create a loop bound to a model and a discovered tool set
    pub fn new(model: Arc<dyn ModelProvider>, tools: Vec<Tool>, config: &AgentConfig) -> Self {
        let signatures = tools.iter().map(Tool::signature).collect();
        let system_prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| SYSTEM_PROMPT.to_string());
        Self {
            model,
            tools,
            signatures,
            system_prompt,
            max_turns: config.max_turns,
        }
    }

    /// Names of the tools this loop can dispatch
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(Tool::name).collect()
    }

    /// Run a conversation to completion and return the updated history
    ///
    /// Errors local to a single tool call are absorbed into the conversation
    /// as result text; only model faults and an exhausted turn budget escape
    /// as errors.
    pub async fn run(&self, conversation: Conversation) -> Result<Conversation> {
        let mut conversation = conversation;
        conversation.ensure_system(&self.system_prompt);

        let mut budget = TurnBudget::new(self.max_turns);
        let mut state = LoopState::AwaitingModel;

        while state != LoopState::Done {
            match state {
                LoopState::AwaitingModel => {
                    let reply = self
                        .model
                        .complete(conversation.messages(), &self.signatures)
                        .await?;

                    tracing::debug!(
                        requested = reply.tool_requests.len(),
                        turn = budget.used(),
                        "model replied"
                    );

                    if reply.tool_requests.is_empty() {
                        conversation.push(Message::assistant(reply.content));
                        state = LoopState::Done;
                    } else {
                        conversation.push(Message::assistant_with_requests(
                            reply.content,
                            reply.tool_requests,
                        ));
                        state = LoopState::AwaitingTools;
                    }
                }
                LoopState::AwaitingTools => {
                    if !budget.consume() {
                        return Err(DatalystError::TurnLimit(budget.max()));
                    }

                    let requests: Vec<ToolRequest> = conversation
                        .last_assistant()
                        .map(|message| message.tool_requests.clone())
                        .unwrap_or_default();

                    // One result per request, in request order
                    for request in &requests {
                        let result = self.resolve(request).await;
                        if result.is_error {
                            tracing::debug!(tool = %request.tool_name, "tool returned an error result");
                        }
                        conversation.push(result.into_message());
                    }
                    state = LoopState::AwaitingModel;
                }
                LoopState::Done => unreachable!("loop exits before entering Done"),
            }
        }

        Ok(conversation)
    }

    /// Resolve one request through the matching tool
    async fn resolve(&self, request: &ToolRequest) -> ToolInvocationResult {
        match self
            .tools
            .iter()
            .find(|tool| tool.name() == request.tool_name)
        {
            Some(tool) => tool.resolve(request).await,
            None => ToolInvocationResult::error(
                &request.id,
                format!("no such tool: {}", request.tool_name),
            ),
        }
    }
}
