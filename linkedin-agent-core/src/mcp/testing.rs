// linkedin-agent-core/src/mcp/testing.rs

//! In-memory MCP endpoint used by unit tests.

use super::{McpConnector, McpSession, ToolDescriptor};
use crate::errors::AgentError;
use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub(crate) enum FakeResponse {
    Text(String),
    ToolError(String),
    AuthError(String),
}

#[derive(Default)]
pub(crate) struct FakeCounters {
    pub connects: AtomicUsize,
    pub tool_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl FakeCounters {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn tool_calls(&self) -> usize {
        self.tool_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn recorded_calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

pub(crate) fn descriptor(name: &str) -> ToolDescriptor {
    let schema = json!({
        "type": "object",
        "properties": {"url": {"type": "string", "description": "LinkedIn URL"}},
    });
    ToolDescriptor {
        name: name.to_string(),
        description: format!("Fake {}", name),
        input_schema: schema.as_object().cloned().unwrap_or_default(),
    }
}

pub(crate) struct FakeConnector {
    pub counters: Arc<FakeCounters>,
    tools: Vec<ToolDescriptor>,
    responses: HashMap<String, FakeResponse>,
    reachable_url: Option<String>,
}

impl FakeConnector {
    pub fn new(tool_names: &[&str]) -> Self {
        Self {
            counters: Arc::new(FakeCounters::default()),
            tools: tool_names.iter().map(|n| descriptor(n)).collect(),
            responses: HashMap::new(),
            reachable_url: None,
        }
    }

    /// Every other URL behaves like a refused connection.
    pub fn reachable_only(mut self, url: &str) -> Self {
        self.reachable_url = Some(url.to_string());
        self
    }

    pub fn respond(mut self, tool: &str, response: FakeResponse) -> Self {
        self.responses.insert(tool.to_string(), response);
        self
    }
}

#[async_trait]
impl McpConnector for FakeConnector {
    async fn connect(&self, url: &str) -> Result<Arc<dyn McpSession>, AgentError> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(reachable) = &self.reachable_url {
            if reachable != url {
                return Err(AgentError::Connection {
                    url: url.to_string(),
                    source: anyhow!("connection refused"),
                });
            }
        }
        Ok(Arc::new(FakeSession {
            counters: self.counters.clone(),
            tools: self.tools.clone(),
            responses: self.responses.clone(),
        }))
    }
}

struct FakeSession {
    counters: Arc<FakeCounters>,
    tools: Vec<ToolDescriptor>,
    responses: HashMap<String, FakeResponse>,
}

#[async_trait]
impl McpSession for FakeSession {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError> {
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, AgentError> {
        self.counters.tool_calls.fetch_add(1, Ordering::SeqCst);
        self.counters
            .calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        match self.responses.get(name) {
            Some(FakeResponse::Text(text)) => Ok(text.clone()),
            Some(FakeResponse::ToolError(msg)) => Err(AgentError::tool(name, msg.clone())),
            Some(FakeResponse::AuthError(msg)) => Err(AgentError::UpstreamAuth(msg.clone())),
            None => Ok(format!("{} called with {}", name, arguments)),
        }
    }

    async fn close(&self) -> Result<(), AgentError> {
        self.counters.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
