// linkedin-agent-core/src/providers/openai.rs
use super::Provider;
use crate::api;
use crate::config::Config;
use crate::models::chat::{ApiResponse, ChatMessage, StreamChunk};
use crate::models::tools::ToolDefinition;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::Client;
use tracing::trace;

/// Any endpoint speaking the OpenAI chat-completions protocol.
#[derive(Clone)]
pub struct OpenAIProvider {
    model_name: String,
    temperature: f32,
    endpoint: String,
    http_client: Client,
    api_key: String,
}

impl OpenAIProvider {
    pub fn new(
        model_name: String,
        temperature: f32,
        endpoint: String,
        http_client: Client,
        api_key: String,
    ) -> Self {
        Self {
            model_name,
            temperature,
            endpoint,
            http_client,
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .build()
            .context("Failed to build HTTP client for OpenAI provider")?;
        Ok(Self::new(
            config.llm_model.clone(),
            config.llm_temperature,
            config.chat_completions_url(),
            http_client,
            config.api_key.clone(),
        ))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn get_completion(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ApiResponse> {
        trace!(model = %self.model_name, "Entering OpenAIProvider::get_completion");
        let body = api::build_chat_request(&self.model_name, messages, tools, self.temperature, false)?;
        api::get_chat_completion(&self.http_client, &self.endpoint, &self.api_key, &body).await
    }

    async fn stream_completion(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        trace!(model = %self.model_name, "Entering OpenAIProvider::stream_completion");
        let body = api::build_chat_request(&self.model_name, messages, tools, self.temperature, true)?;
        api::stream_chat_completion(&self.http_client, &self.endpoint, &self.api_key, &body).await
    }
}
