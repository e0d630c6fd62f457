// linkedin-agent-core/src/errors.rs
use thiserror::Error;

/// Errors surfaced by the agent and its collaborators.
///
/// Every variant propagates to the caller unchanged; nothing in this crate
/// retries or recovers on its own.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Missing or invalid configuration setting.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// The MCP endpoint could not be reached or the handshake failed.
    #[error("Connection Error: MCP endpoint '{url}' is unreachable: {source}")]
    Connection {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// The remote service rejected its credentials (e.g. an expired session cookie).
    #[error("Upstream Auth Error: {0}")]
    UpstreamAuth(String),

    /// A remote tool call failed or returned an error payload.
    #[error("Tool Error: '{tool}' failed: {message}")]
    ToolInvocation { tool: String, message: String },

    /// Operation invoked in the wrong lifecycle state.
    #[error("Agent State Error: {0}")]
    State(String),

    /// Error during interaction with the AI model API.
    #[error("API Error: {0}")]
    Api(#[source] anyhow::Error),

    /// The agent used up its tool-call rounds without a final answer.
    #[error("Agent stopped after reaching maximum iterations ({0})")]
    MaxIterations(usize),

    /// A convenience method received an unusable argument.
    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),
}

impl AgentError {
    pub fn config(msg: impl Into<String>) -> Self {
        AgentError::Config(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        AgentError::State(msg.into())
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        AgentError::ToolInvocation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// True for failures the caller fixes by re-authenticating upstream.
    pub fn is_upstream_auth(&self) -> bool {
        matches!(self, AgentError::UpstreamAuth(_))
    }
}
