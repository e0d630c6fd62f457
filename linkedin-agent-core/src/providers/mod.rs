// linkedin-agent-core/src/providers/mod.rs
use crate::models::chat::{ApiResponse, ChatMessage, StreamChunk};
use crate::models::tools::ToolDefinition;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// A chat model that can answer with text or with requests to call tools.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn get_completion(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ApiResponse>;

    /// Same request, answered as a stream of incremental chunks.
    async fn stream_completion(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>>;

    fn name(&self) -> &str;
}

pub mod openai;
