// linkedin-agent-core/src/lib.rs

#![doc = include_str!("../../README.md")]

pub mod agent;
pub mod api;
pub mod config;
pub mod errors;
pub mod mcp;
pub mod models;
pub mod prompts;
pub mod providers;
pub mod session;


pub use agent::{AgentEvent, AgentOutput, FunctionAgent, ToolExecutionResult, ToolExecutionStatus};
pub use config::{load_config, Config, FileConfig};
pub use errors::AgentError;
pub use mcp::{McpConnector, McpSession, RemoteTool, ToolDescriptor, ToolSet};
pub use models::chat::{ApiResponse, ChatMessage, Choice};
pub use models::tools::{ToolCall, ToolDefinition, ToolFunction};
pub use providers::openai::OpenAIProvider;
pub use providers::Provider;
pub use session::{LinkedInAgent, ReplyStream, SessionState};

pub use async_trait::async_trait;
