// linkedin-agent-core/src/mcp/toolset.rs
use super::{McpConnector, McpSession, ToolDescriptor};
use crate::errors::AgentError;
use crate::models::tools::ToolDefinition;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A discovered remote tool bound to the session that serves it.
#[derive(Clone)]
pub struct RemoteTool {
    descriptor: ToolDescriptor,
    session: Arc<dyn McpSession>,
}

impl fmt::Debug for RemoteTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTool")
            .field("name", &self.descriptor.name)
            .field("description", &self.descriptor.description)
            .finish_non_exhaustive()
    }
}

impl RemoteTool {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn description(&self) -> &str {
        &self.descriptor.description
    }

    pub fn input_schema(&self) -> &Map<String, Value> {
        &self.descriptor.input_schema
    }

    /// Sends the call over the MCP session and waits for its text result.
    pub async fn call(&self, arguments: Value) -> Result<String, AgentError> {
        self.session.call_tool(&self.descriptor.name, arguments).await
    }

    /// Schema handed to the LLM. Servers that omit a schema get an empty object one.
    pub fn definition(&self) -> ToolDefinition {
        let parameters = if self.descriptor.input_schema.is_empty() {
            serde_json::json!({"type": "object", "properties": {}})
        } else {
            Value::Object(self.descriptor.input_schema.clone())
        };
        ToolDefinition {
            name: self.descriptor.name.clone(),
            description: self.descriptor.description.clone(),
            parameters,
        }
    }
}

/// The tools exposed to the agent for one session.
pub struct ToolSet {
    tools: Vec<RemoteTool>,
    discovered: Vec<String>,
    session: Arc<dyn McpSession>,
    closed: AtomicBool,
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.names())
            .field("discovered", &self.discovered)
            .finish_non_exhaustive()
    }
}

/// Opens a session at `url` and discovers its tools.
///
/// An endpoint that answers with no tools yields an empty set.
pub async fn connect(connector: &dyn McpConnector, url: &str) -> Result<ToolSet, AgentError> {
    let session = connector.connect(url).await?;
    let descriptors = match session.list_tools().await {
        Ok(descriptors) => descriptors,
        Err(e) => {
            if let Err(close_err) = session.close().await {
                warn!(error = %close_err, "Failed to close MCP session after discovery error");
            }
            return Err(e);
        }
    };
    info!(%url, count = descriptors.len(), "Discovered MCP tools");
    Ok(ToolSet::new(session, descriptors))
}

impl ToolSet {
    pub fn new(session: Arc<dyn McpSession>, descriptors: Vec<ToolDescriptor>) -> Self {
        let discovered = descriptors.iter().map(|d| d.name.clone()).collect();
        let tools = descriptors
            .into_iter()
            .map(|descriptor| RemoteTool {
                descriptor,
                session: session.clone(),
            })
            .collect();
        Self {
            tools,
            discovered,
            session,
            closed: AtomicBool::new(false),
        }
    }

    /// Keeps only allow-listed tools. An empty allow-list keeps everything;
    /// allow-listed names the server never advertised are ignored.
    pub fn filter(mut self, allow_list: &BTreeSet<String>) -> Self {
        if allow_list.is_empty() {
            return self;
        }
        for missing in allow_list.iter().filter(|name| !self.was_discovered(name)) {
            debug!(tool = %missing, "Allow-listed tool was not offered by the MCP server");
        }
        self.tools.retain(|tool| allow_list.contains(tool.name()));
        info!(kept = self.tools.len(), "Applied tool allow-list");
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(RemoteTool::name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&RemoteTool> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteTool> {
        self.tools.iter()
    }

    /// Whether the server advertised `name`, even if the allow-list dropped it.
    pub fn was_discovered(&self, name: &str) -> bool {
        self.discovered.iter().any(|n| n == name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(RemoteTool::definition).collect()
    }

    /// Calls a tool on the session directly, bypassing the allow-list.
    pub async fn call_unlisted(&self, name: &str, arguments: Value) -> Result<String, AgentError> {
        self.session.call_tool(name, arguments).await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Releases the MCP session once; later calls return immediately.
    pub async fn close(&self) -> Result<(), AgentError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Tool set already closed");
            return Ok(());
        }
        self.session.close().await
    }
}
