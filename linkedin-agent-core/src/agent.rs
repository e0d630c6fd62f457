// linkedin-agent-core/src/agent.rs
use crate::config::Config;
use crate::errors::AgentError;
use crate::mcp::ToolSet;
use crate::models::chat::{ChatMessage, StreamedMessage};
use crate::models::tools::{ToolCall, ToolDefinition};
use crate::providers::Provider;
use anyhow::anyhow;
use async_stream::stream;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

// Verbose agents report their rounds and tool calls at INFO, quiet ones at DEBUG.
macro_rules! agent_log {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

/// Details the execution result of a single tool call within an [`AgentOutput`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolExecutionResult {
    /// The unique ID associated with the AI's request to call this tool.
    pub tool_call_id: String,
    /// The name of the tool that was executed.
    pub tool_name: String,
    /// The input arguments passed to the tool (represented as a JSON value).
    pub input: Value,
    /// The string output produced by the tool (or an error message if status is Failure).
    pub output: String,
    /// The status of the execution.
    pub status: ToolExecutionStatus,
}

/// Indicates whether a tool execution succeeded or failed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub enum ToolExecutionStatus {
    Success,
    Failure,
}

/// Represents the final output of an [`FunctionAgent::run`] execution.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AgentOutput {
    /// Text the AI produced over all rounds of the run, including text sent
    /// alongside tool calls. Equals the concatenated fragments of a streamed run.
    pub response: String,
    /// Every tool executed during the run, in call order.
    pub tool_results: Vec<ToolExecutionResult>,
    /// The conversation after this run, excluding the system prompt.
    pub messages: Vec<ChatMessage>,
}

/// Items produced by [`FunctionAgent::run_streaming`].
#[derive(Debug)]
pub enum AgentEvent {
    Fragment(String),
    Finished(AgentOutput),
}

/// An LLM that may call tools from a [`ToolSet`] for a bounded number of rounds
/// before it answers.
pub struct FunctionAgent {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolSet>,
    tool_definitions: Vec<ToolDefinition>,
    system_prompt: String,
    max_iterations: usize,
    verbose: bool,
}

impl FunctionAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolSet>,
        system_prompt: String,
        max_iterations: usize,
        verbose: bool,
    ) -> Self {
        let tool_definitions = tools.definitions();
        Self {
            provider,
            tools,
            tool_definitions,
            system_prompt,
            max_iterations,
            verbose,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, tools: Arc<ToolSet>, config: &Config) -> Self {
        Self::new(
            provider,
            tools,
            config.system_prompt.clone(),
            config.max_iterations,
            config.agent_verbose,
        )
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn tool_definitions(&self) -> Option<&[ToolDefinition]> {
        if self.tool_definitions.is_empty() {
            None
        } else {
            Some(&self.tool_definitions)
        }
    }

    fn seed_messages(&self, history: &[ChatMessage], instruction: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(instruction));
        messages
    }

    fn finish(
        &self,
        messages: Vec<ChatMessage>,
        response: String,
        tool_results: Vec<ToolExecutionResult>,
    ) -> AgentOutput {
        agent_log!(self.verbose, tools_used = tool_results.len(), "Received final response from AI.");
        AgentOutput {
            response,
            tool_results,
            messages: messages.into_iter().skip(1).collect(),
        }
    }

    /// Runs one instruction on top of `history` until the model stops asking for tools.
    pub async fn run(
        &self,
        history: &[ChatMessage],
        instruction: &str,
    ) -> Result<AgentOutput, AgentError> {
        let mut messages = self.seed_messages(history, instruction);
        let mut tool_results = Vec::new();
        let mut response = String::new();

        for iteration in 1..=self.max_iterations {
            agent_log!(self.verbose, iteration, "Starting agent iteration {}.", iteration);
            trace!(payload = %serde_json::to_string_pretty(&messages).unwrap_or_default(), "Messages sent to API");

            let api_response = self
                .provider
                .get_completion(messages.clone(), self.tool_definitions())
                .await
                .map_err(|e| {
                    error!(error = ?e, "API call failed during agent run.");
                    AgentError::Api(e.context("API call failed during agent run"))
                })?;

            let choice = api_response.choices.into_iter().next().ok_or_else(|| {
                error!("API response contained no choices.");
                AgentError::Api(anyhow!("API response contained no choices"))
            })?;
            let message = choice.message;
            messages.push(message.clone());
            if let Some(text) = &message.content {
                response.push_str(text);
            }

            if let Some(tool_calls) = message.requested_tool_calls() {
                self.execute_tool_calls(tool_calls, &mut messages, &mut tool_results)
                    .await?;
                continue;
            }
            return Ok(self.finish(messages, response, tool_results));
        }

        error!(limit = self.max_iterations, "Agent reached maximum iteration limit.");
        Err(AgentError::MaxIterations(self.max_iterations))
    }

    /// Streaming variant of [`run`](Self::run).
    ///
    /// Yields text fragments as the provider produces them and ends with a
    /// single [`AgentEvent::Finished`]. Dropping the stream early abandons the
    /// in-flight request.
    pub fn run_streaming(
        &self,
        history: Vec<ChatMessage>,
        instruction: String,
    ) -> BoxStream<'_, Result<AgentEvent, AgentError>> {
        Box::pin(stream! {
            let mut messages = self.seed_messages(&history, &instruction);
            let mut tool_results = Vec::new();
            let mut response = String::new();

            for iteration in 1..=self.max_iterations {
                agent_log!(self.verbose, iteration, "Starting streamed agent iteration {}.", iteration);
                let mut chunks = match self
                    .provider
                    .stream_completion(messages.clone(), self.tool_definitions())
                    .await
                {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        error!(error = ?e, "Streaming API call failed during agent run.");
                        yield Err(AgentError::Api(e.context("API call failed during agent run")));
                        return;
                    }
                };

                let mut streamed = StreamedMessage::default();
                while let Some(chunk) = chunks.next().await {
                    match chunk {
                        Ok(chunk) => {
                            if let Some(text) = streamed.apply(chunk) {
                                response.push_str(&text);
                                yield Ok(AgentEvent::Fragment(text));
                            }
                        }
                        Err(e) => {
                            yield Err(AgentError::Api(e.context("Streaming response failed")));
                            return;
                        }
                    }
                }
                debug!(finish_reason = ?streamed.finish_reason(), "Streamed response complete.");

                let message = streamed.into_message();
                messages.push(message.clone());

                if let Some(tool_calls) = message.requested_tool_calls() {
                    if let Err(e) = self
                        .execute_tool_calls(tool_calls, &mut messages, &mut tool_results)
                        .await
                    {
                        yield Err(e);
                        return;
                    }
                    continue;
                }
                yield Ok(AgentEvent::Finished(self.finish(messages, response, tool_results)));
                return;
            }

            error!(limit = self.max_iterations, "Agent reached maximum iteration limit.");
            yield Err(AgentError::MaxIterations(self.max_iterations));
        })
    }

    /// Executes every requested call and appends one `tool` message per call.
    ///
    /// Ordinary failures become tool output so the model can react to them;
    /// an upstream authentication failure aborts the run.
    async fn execute_tool_calls(
        &self,
        tool_calls: &[ToolCall],
        messages: &mut Vec<ChatMessage>,
        tool_results: &mut Vec<ToolExecutionResult>,
    ) -> Result<(), AgentError> {
        agent_log!(self.verbose, count = tool_calls.len(), "AI requested {} tool call(s).", tool_calls.len());

        for tool_call in tool_calls {
            let tool_name = tool_call.function.name.as_str();
            let raw_arguments = tool_call.function.arguments.trim();
            let parsed: Result<Value, serde_json::Error> = if raw_arguments.is_empty() {
                Ok(Value::Object(Default::default()))
            } else {
                serde_json::from_str(raw_arguments)
            };

            let (input, output, status) = match parsed {
                Err(e) => {
                    error!(tool_call_id = %tool_call.id, tool_name = %tool_name, error = ?e, "Failed to parse arguments for tool '{}'.", tool_name);
                    (
                        Value::String(raw_arguments.to_string()),
                        format!(
                            "Error parsing arguments for tool '{}': {}. Arguments received: {}",
                            tool_name, e, raw_arguments
                        ),
                        ToolExecutionStatus::Failure,
                    )
                }
                Ok(input) => match self.tools.get(tool_name) {
                    None => {
                        warn!(tool_name = %tool_name, "AI requested a tool that is not available.");
                        (
                            input,
                            format!("Error: Unknown tool name '{}'", tool_name),
                            ToolExecutionStatus::Failure,
                        )
                    }
                    Some(tool) => {
                        agent_log!(self.verbose, tool_call_id = %tool_call.id, tool_name = %tool_name, arguments = %input, "Calling tool '{}'.", tool_name);
                        match tool.call(input.clone()).await {
                            Ok(output) => {
                                agent_log!(self.verbose, tool_call_id = %tool_call.id, tool_name = %tool_name, "Tool '{}' executed successfully.", tool_name);
                                trace!(tool_call_id = %tool_call.id, output = %output, "Output from tool '{}'", tool_name);
                                (input, output, ToolExecutionStatus::Success)
                            }
                            Err(e) if e.is_upstream_auth() => {
                                error!(tool_call_id = %tool_call.id, tool_name = %tool_name, error = %e, "Upstream rejected credentials; aborting run.");
                                return Err(e);
                            }
                            Err(e) => {
                                error!(tool_call_id = %tool_call.id, tool_name = %tool_name, error = %e, "Execution failed for tool '{}'.", tool_name);
                                (
                                    input,
                                    format!("Error executing tool '{}': {}", tool_name, e),
                                    ToolExecutionStatus::Failure,
                                )
                            }
                        }
                    }
                },
            };

            messages.push(ChatMessage::tool_result(tool_call.id.clone(), output.clone()));
            tool_results.push(ToolExecutionResult {
                tool_call_id: tool_call.id.clone(),
                tool_name: tool_name.to_string(),
                input,
                output,
                status,
            });
        }
        Ok(())
    }
}
