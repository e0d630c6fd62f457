// linkedin-agent-core/src/mcp/client.rs
use super::{McpConnector, McpSession, ToolDescriptor};
use crate::errors::AgentError;
use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use rmcp::model::{CallToolRequestParams, ClientCapabilities, ClientInfo, Implementation};
use rmcp::service::{ClientInitializeError, Peer, RoleClient, RunningService};
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use serde_json::{json, Map, Value};
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

const AUTH_FAILURE_MARKERS: &[&str] = &[
    "cookie expired",
    "cookie has expired",
    "cookie is invalid",
    "cookie invalid",
    "invalid cookie",
    "li_at",
    "unauthorized",
    "authentication failed",
    "authentication required",
    "auth required",
    "insufficient scope",
    "not logged in",
    "login required",
    "session expired",
    "session has expired",
    "invalid credentials",
    "403 forbidden",
];

/// What rmcp's streamable HTTP transport reports for a 401 or 403 carrying `WWW-Authenticate`.
const AUTH_CHALLENGES: &[&str] = &["Auth required", "Insufficient scope"];

const STATUS_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Heuristic used to tell upstream credential problems apart from other failures.
pub fn looks_like_auth_failure(message: &str) -> bool {
    let lowered = message.to_lowercase();
    AUTH_FAILURE_MARKERS.iter().any(|marker| lowered.contains(marker))
}

fn classify_tool_failure(tool: &str, message: &str) -> AgentError {
    if looks_like_auth_failure(message) {
        AgentError::UpstreamAuth(format!("tool '{}' was rejected upstream: {}", tool, message))
    } else {
        AgentError::tool(tool, message)
    }
}

/// Joins an error and all of its sources into one line.
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Replays the initialize request outside rmcp to read the HTTP status.
///
/// rmcp only keeps the status of a rejection when the server sends a
/// `WWW-Authenticate` challenge; a bare 401 surfaces as an unexpected content type.
async fn rejection_status(url: &str, client_info: &ClientInfo) -> Option<StatusCode> {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 0,
        "method": "initialize",
        "params": client_info,
    });
    let response = match Client::new()
        .post(url)
        .header(ACCEPT, "application/json, text/event-stream")
        .timeout(STATUS_CHECK_TIMEOUT)
        .json(&body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            debug!(%url, error = %e, "Handshake status check failed");
            return None;
        }
    };
    let status = response.status();
    debug!(%url, %status, "Handshake status check answered");
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN).then_some(status)
}

/// Connects over MCP streamable HTTP using `rmcp`.
#[derive(Debug, Clone)]
pub struct RmcpConnector {
    client_name: String,
    client_version: String,
}

impl Default for RmcpConnector {
    fn default() -> Self {
        Self {
            client_name: env!("CARGO_PKG_NAME").to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl RmcpConnector {
    fn client_info(&self) -> ClientInfo {
        ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: self.client_name.clone(),
                version: self.client_version.clone(),
                title: None,
                description: None,
                icons: None,
                website_url: None,
            },
        }
    }
}

/// What a failed handshake left behind, detached from rmcp's error.
struct HandshakeFailure {
    message: String,
    transport_cause: Option<String>,
}

impl HandshakeFailure {
    fn new(e: &ClientInitializeError) -> Self {
        let transport_cause = match e {
            ClientInitializeError::TransportError { error, .. } => Some(error.error.to_string()),
            _ => None,
        };
        Self {
            message: error_chain(e),
            transport_cause,
        }
    }

    /// Tells a rejected client apart from an unreachable or broken endpoint.
    async fn into_error(self, url: &str, client_info: &ClientInfo) -> AgentError {
        let rejection = match &self.transport_cause {
            Some(cause) if AUTH_CHALLENGES.contains(&cause.as_str()) => Some(cause.clone()),
            _ if looks_like_auth_failure(&self.message) => Some(self.message.clone()),
            Some(_) => rejection_status(url, client_info)
                .await
                .map(|status| format!("HTTP {}", status)),
            None => None,
        };

        match rejection {
            Some(reason) => {
                warn!(%url, %reason, "MCP endpoint rejected the client credentials");
                AgentError::UpstreamAuth(format!("MCP endpoint '{}' rejected the client: {}", url, reason))
            }
            None => AgentError::Connection {
                url: url.to_string(),
                source: anyhow!(self.message),
            },
        }
    }
}

#[async_trait]
impl McpConnector for RmcpConnector {
    async fn connect(&self, url: &str) -> Result<Arc<dyn McpSession>, AgentError> {
        info!(%url, "Establishing MCP connection...");
        let transport = StreamableHttpClientTransport::from_uri(url.to_string());
        let client_info = self.client_info();

        trace!("Attempting MCP handshake...");
        let failure = match client_info.clone().serve(transport).await {
            Ok(service) => {
                info!(server_info = ?service.peer_info(), "MCP connection established.");
                return Ok(Arc::new(RmcpSession::new(url, service)));
            }
            Err(e) => {
                error!(%url, error = %e, "Failed to establish MCP connection during handshake");
                HandshakeFailure::new(&e)
            }
        };
        Err(failure.into_error(url, &client_info).await)
    }
}

pub struct RmcpSession {
    url: String,
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
}

impl RmcpSession {
    fn new(url: &str, service: RunningService<RoleClient, ClientInfo>) -> Self {
        Self {
            url: url.to_string(),
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
        }
    }

    async fn ensure_open(&self) -> Result<(), AgentError> {
        if self.service.lock().await.is_none() {
            error!(url = %self.url, "Attempted to use MCP session after it was closed.");
            return Err(AgentError::state("MCP session is closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl McpSession for RmcpSession {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError> {
        self.ensure_open().await?;
        debug!("Calling peer.list_all_tools().");
        let tools = self.peer.list_all_tools().await.map_err(|e| {
            error!(error = %e, "peer.list_all_tools() failed");
            let message = e.to_string();
            if looks_like_auth_failure(&message) {
                AgentError::UpstreamAuth(message)
            } else {
                AgentError::Connection {
                    url: self.url.clone(),
                    source: anyhow!("Failed to list tools via MCP: {}", message),
                }
            }
        })?;

        Ok(tools
            .into_iter()
            .map(|tool| ToolDescriptor {
                name: tool.name.to_string(),
                description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
                input_schema: (*tool.input_schema).clone(),
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, AgentError> {
        self.ensure_open().await?;
        let arguments: Option<Map<String, Value>> = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                error!(args = ?other, "Invalid tool arguments type");
                return Err(AgentError::tool(
                    name,
                    "tool arguments must be a JSON object or null",
                ));
            }
        };
        let params = CallToolRequestParams {
            meta: None,
            name: name.to_string().into(),
            arguments,
            task: None,
        };
        debug!(tool_name = %name, "Calling peer.call_tool().");
        let result = self.peer.call_tool(params).await.map_err(|e| {
            error!(tool_name = %name, error = %e, "peer.call_tool() failed");
            classify_tool_failure(name, &e.to_string())
        })?;

        let text = result
            .content
            .iter()
            .filter_map(|content| serde_json::to_value(content).ok())
            .map(|value| match value.get("text").and_then(Value::as_str) {
                Some(text) => text.to_string(),
                None => value.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n");

        if result.is_error.unwrap_or(false) {
            warn!(tool_name = %name, error = %text, "Remote tool reported an error");
            let message = if text.is_empty() { "unknown MCP error" } else { text.as_str() };
            return Err(classify_tool_failure(name, message));
        }
        Ok(text)
    }

    async fn close(&self) -> Result<(), AgentError> {
        let service = self.service.lock().await.take();
        match service {
            Some(service) => {
                info!(url = %self.url, "Closing MCP connection.");
                service.cancel().await.map_err(|e| AgentError::Connection {
                    url: self.url.clone(),
                    source: anyhow!("Failed to close MCP session: {}", e),
                })?;
                Ok(())
            }
            None => {
                trace!(url = %self.url, "MCP connection already closed.");
                Ok(())
            }
        }
    }
}
