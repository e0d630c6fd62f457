// linkedin-agent-core/src/session.rs

//! The user-facing LinkedIn agent: one MCP session, one tool-calling LLM and
//! the running conversation between them.
//!
//! ```text
//! Uninitialized --initialize()--> Ready --close()--> Closed
//! ```
//!
//! A failed `initialize` leaves the agent `Uninitialized` so it can be retried.
//! `Closed` is terminal.

use crate::agent::{AgentEvent, FunctionAgent};
use crate::config::Config;
use crate::errors::AgentError;
use crate::mcp::{self, McpConnector, RmcpConnector, ToolSet};
use crate::models::chat::ChatMessage;
use crate::prompts::{self, CLOSE_SESSION_TOOL};
use crate::providers::openai::OpenAIProvider;
use crate::providers::Provider;
use async_stream::stream;
use futures::stream::{BoxStream, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Text fragments of one streamed reply.
pub type ReplyStream<'a> = BoxStream<'a, Result<String, AgentError>>;

/// Observable lifecycle of a [`LinkedInAgent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Closed,
}

struct ReadySession {
    agent: FunctionAgent,
    tools: Arc<ToolSet>,
    history: Vec<ChatMessage>,
}

enum Lifecycle {
    Uninitialized,
    Ready(Box<ReadySession>),
    Closed,
}

pub struct LinkedInAgent {
    config: Config,
    connector: Arc<dyn McpConnector>,
    provider: Option<Arc<dyn Provider>>,
    lifecycle: Lifecycle,
}

impl LinkedInAgent {
    /// Creates an agent that talks to the configured MCP endpoint over
    /// streamable HTTP and to an OpenAI-compatible chat API.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connector: Arc::new(RmcpConnector::default()),
            provider: None,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    pub fn with_connector(mut self, connector: Arc<dyn McpConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Uses `provider` instead of building an [`OpenAIProvider`] from the config.
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the configuration of an agent that has not connected yet.
    pub fn reconfigure(&mut self, config: Config) -> Result<(), AgentError> {
        match self.state() {
            SessionState::Uninitialized => {
                self.config = config;
                Ok(())
            }
            state => Err(AgentError::state(format!(
                "cannot reconfigure an agent in state {:?}",
                state
            ))),
        }
    }

    pub fn state(&self) -> SessionState {
        match self.lifecycle {
            Lifecycle::Uninitialized => SessionState::Uninitialized,
            Lifecycle::Ready(_) => SessionState::Ready,
            Lifecycle::Closed => SessionState::Closed,
        }
    }

    /// Connects to the MCP endpoint, discovers and filters its tools and
    /// builds the tool-calling agent.
    ///
    /// Calling it on a ready agent does nothing.
    pub async fn initialize(&mut self) -> Result<(), AgentError> {
        match self.lifecycle {
            Lifecycle::Ready(_) => {
                debug!("Agent already initialized");
                return Ok(());
            }
            Lifecycle::Closed => {
                return Err(AgentError::state("cannot initialize a closed agent"));
            }
            Lifecycle::Uninitialized => {}
        }

        if self.config.api_key.trim().is_empty() {
            return Err(AgentError::config(
                "an LLM API key is required before connecting",
            ));
        }

        let provider: Arc<dyn Provider> = match &self.provider {
            Some(provider) => provider.clone(),
            None => Arc::new(
                OpenAIProvider::from_config(&self.config)
                    .map_err(|e| AgentError::Api(e.context("Failed to set up LLM provider")))?,
            ),
        };

        let url = self.config.mcp_server_url.clone();
        info!(%url, model = %self.config.llm_model, "Initializing LinkedIn agent");
        let mut tools = mcp::connect(self.connector.as_ref(), &url).await?;
        if let Some(allow_list) = &self.config.allowed_tools {
            tools = tools.filter(allow_list);
        }
        if tools.is_empty() {
            warn!("No MCP tools are available to the agent");
        }

        let tools = Arc::new(tools);
        let agent = FunctionAgent::from_config(provider, tools.clone(), &self.config);
        info!(
            provider = agent.provider_name(),
            tools = ?tools.names(),
            "LinkedIn agent ready"
        );
        self.lifecycle = Lifecycle::Ready(Box::new(ReadySession {
            agent,
            tools,
            history: Vec::new(),
        }));
        Ok(())
    }

    fn ready_mut(&mut self) -> Result<&mut ReadySession, AgentError> {
        match &mut self.lifecycle {
            Lifecycle::Ready(ready) => Ok(ready.as_mut()),
            Lifecycle::Uninitialized => Err(AgentError::state(
                "agent is not initialized; call initialize() first",
            )),
            Lifecycle::Closed => Err(AgentError::state("agent is closed")),
        }
    }

    fn ready(&self) -> Result<&ReadySession, AgentError> {
        match &self.lifecycle {
            Lifecycle::Ready(ready) => Ok(ready.as_ref()),
            Lifecycle::Uninitialized => Err(AgentError::state(
                "agent is not initialized; call initialize() first",
            )),
            Lifecycle::Closed => Err(AgentError::state("agent is closed")),
        }
    }

    /// Sends one message and returns the final answer after any tool calls.
    ///
    /// The exchange is appended to the conversation only when it succeeds.
    pub async fn chat(&mut self, message: &str) -> Result<String, AgentError> {
        let ready = self.ready_mut()?;
        require_non_empty("message", message)?;
        let output = ready.agent.run(&ready.history, message).await?;
        debug!(tools_used = output.tool_results.len(), "Chat turn complete");
        ready.history = output.messages;
        Ok(output.response)
    }

    /// Like [`chat`](Self::chat) but yields the answer in fragments.
    ///
    /// The fragments concatenate to the answer `chat` would have returned.
    /// State errors are reported before any stream is created.
    pub async fn stream_chat(&mut self, message: &str) -> Result<ReplyStream<'_>, AgentError> {
        let ready = self.ready_mut()?;
        require_non_empty("message", message)?;
        let history = ready.history.clone();
        let instruction = message.to_string();

        Ok(Box::pin(stream! {
            let ReadySession { agent, history: conversation, .. } = ready;
            let mut events = agent.run_streaming(history, instruction);
            while let Some(event) = events.next().await {
                match event {
                    Ok(AgentEvent::Fragment(text)) => yield Ok(text),
                    Ok(AgentEvent::Finished(output)) => {
                        debug!(tools_used = output.tool_results.len(), "Streamed chat turn complete");
                        *conversation = output.messages;
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }))
    }

    pub async fn get_recommended_jobs(&mut self) -> Result<String, AgentError> {
        self.chat(&prompts::recommended_jobs()).await
    }

    pub async fn get_profile_insights(&mut self, profile_url: &str) -> Result<String, AgentError> {
        let profile_url = require_non_empty("profile_url", profile_url)?;
        self.chat(&prompts::profile_insights(profile_url)).await
    }

    pub async fn get_company_insights(&mut self, company_url: &str) -> Result<String, AgentError> {
        let company_url = require_non_empty("company_url", company_url)?;
        self.chat(&prompts::company_insights(company_url)).await
    }

    /// `job` may be a posting URL or a bare job ID.
    pub async fn analyze_job(&mut self, job: &str) -> Result<String, AgentError> {
        let job = require_non_empty("job", job)?;
        self.chat(&prompts::job_analysis(job)).await
    }

    pub async fn search_jobs(&mut self, keywords: &str, location: &str) -> Result<String, AgentError> {
        let keywords = require_non_empty("keywords", keywords)?;
        let location = require_non_empty("location", location)?;
        self.chat(&prompts::job_search(keywords, location)).await
    }

    /// Names of the tools the model may call, in discovery order.
    pub fn tools(&self) -> Result<Vec<String>, AgentError> {
        let ready = self.ready()?;
        Ok(ready.tools.names().into_iter().map(String::from).collect())
    }

    /// The conversation so far, without the system prompt.
    pub fn history(&self) -> Result<&[ChatMessage], AgentError> {
        Ok(&self.ready()?.history)
    }

    /// Forgets previous turns while keeping the MCP session open.
    pub fn reset_conversation(&mut self) -> Result<(), AgentError> {
        let ready = self.ready_mut()?;
        debug!(messages = ready.history.len(), "Clearing conversation");
        ready.history.clear();
        Ok(())
    }

    /// Ends the remote browser session (when the server offers one) and
    /// releases the MCP connection. Calling it again does nothing.
    pub async fn close(&mut self) -> Result<(), AgentError> {
        match std::mem::replace(&mut self.lifecycle, Lifecycle::Closed) {
            Lifecycle::Closed => {
                debug!("Agent already closed");
                Ok(())
            }
            Lifecycle::Uninitialized => {
                debug!("Closing agent that never connected");
                Ok(())
            }
            Lifecycle::Ready(ready) => {
                let ReadySession { agent, tools, .. } = *ready;
                drop(agent);
                if tools.was_discovered(CLOSE_SESSION_TOOL) {
                    match tools.call_unlisted(CLOSE_SESSION_TOOL, json!({})).await {
                        Ok(output) => debug!(%output, "Remote session closed"),
                        Err(e) => warn!(error = %e, "Failed to close remote session"),
                    }
                }
                tools.close().await?;
                info!("LinkedIn agent closed");
                Ok(())
            }
        }
    }
}

fn require_non_empty<'a>(name: &str, value: &'a str) -> Result<&'a str, AgentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AgentError::InvalidArgument(format!("{} must not be empty", name)))
    } else {
        Ok(trimmed)
    }
}
