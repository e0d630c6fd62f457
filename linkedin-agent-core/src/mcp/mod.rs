// linkedin-agent-core/src/mcp/mod.rs

//! Bridge between a remote MCP endpoint and the agent's tool set.

use crate::errors::AgentError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

pub mod client;
pub mod toolset;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{looks_like_auth_failure, RmcpConnector, RmcpSession};
pub use toolset::{connect, RemoteTool, ToolSet};

/// A tool as advertised by the remote server during discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Map<String, Value>,
}

/// An open client session with one MCP endpoint.
#[async_trait]
pub trait McpSession: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError>;

    /// Invokes `name` and returns the text content of its result.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, AgentError>;

    /// Releases the connection. Calling it again is a no-op.
    async fn close(&self) -> Result<(), AgentError>;
}

/// Opens sessions. Split from [`McpSession`] so tests can count connection attempts.
#[async_trait]
pub trait McpConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Arc<dyn McpSession>, AgentError>;
}
