// linkedin-agent-core/src/api.rs

//! Calls to an OpenAI-compatible chat-completions endpoint.

use anyhow::{anyhow, Context, Result};
use async_stream::stream;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use serde_json::{json, to_value, Value};
use tracing::{debug, trace};

use crate::models::chat::{ApiResponse, ChatMessage, StreamChunk};
use crate::models::tools::ToolDefinition;

/// Builds the JSON body of a chat-completions request.
pub fn build_chat_request(
    model_name: &str,
    messages: Vec<ChatMessage>,
    tool_definitions: Option<&[ToolDefinition]>,
    temperature: f32,
    stream: bool,
) -> Result<Value> {
    let mut request_map = serde_json::Map::new();
    request_map.insert("model".to_string(), json!(model_name));
    request_map.insert("messages".to_string(), to_value(messages)?);
    request_map.insert("temperature".to_string(), json!(temperature));

    let tools_json: Vec<Value> = tool_definitions
        .unwrap_or_default()
        .iter()
        .map(|tool_def| {
            json!({
                "type": "function",
                "function": tool_def
            })
        })
        .collect();

    if !tools_json.is_empty() {
        request_map.insert("tools".to_string(), Value::Array(tools_json));
    }
    if stream {
        request_map.insert("stream".to_string(), json!(true));
    }
    Ok(Value::Object(request_map))
}

/// Sends one blocking completion request. Errors are returned as-is, never retried.
pub async fn get_chat_completion(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    request_body: &Value,
) -> Result<ApiResponse> {
    debug!(url = %endpoint, "Sending chat completion request");
    trace!(body = %serde_json::to_string_pretty(request_body).unwrap_or_default(), "Request JSON");

    let response = client
        .post(endpoint)
        .bearer_auth(api_key)
        .json(request_body)
        .send()
        .await
        .with_context(|| format!("Failed to send request to {}", endpoint))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .context("Failed to read API error response body")?;
        debug!(%status, body = %error_text, "API request failed");
        return Err(anyhow!("API error: {} - {}", status, error_text));
    }

    let response_value: Value = response
        .json()
        .await
        .context("Failed to read API response body as JSON")?;

    let api_response: ApiResponse = serde_json::from_value(response_value.clone())
        .map_err(|e| {
            debug!(body = ?response_value, "Failed to deserialize API response");
            anyhow!("Failed to deserialize API response").context(e)
        })?;

    if let Some(choice) = api_response.choices.first() {
        match &choice.message.tool_calls {
            Some(tool_calls) => debug!(count = tool_calls.len(), "Response requests tool calls"),
            None => debug!("No tool calls"),
        }
    } else {
        debug!("Response has empty 'choices' array");
    }

    Ok(api_response)
}

/// Sends a streaming completion request and yields each decoded SSE chunk.
///
/// The request body must already carry `"stream": true`. The returned stream
/// ends at `data: [DONE]` or when the connection closes.
pub async fn stream_chat_completion(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    request_body: &Value,
) -> Result<BoxStream<'static, Result<StreamChunk>>> {
    debug!(url = %endpoint, "Sending streaming chat completion request");

    let response = client
        .post(endpoint)
        .bearer_auth(api_key)
        .json(request_body)
        .send()
        .await
        .with_context(|| format!("Failed to send request to {}", endpoint))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        debug!(%status, body = %error_text, "Streaming API request failed");
        return Err(anyhow!("API error: {} - {}", status, error_text));
    }

    let mut bytes = response.bytes_stream();
    Ok(Box::pin(stream! {
        let mut decoder = SseDecoder::default();
        while let Some(next) = bytes.next().await {
            let data = match next {
                Ok(data) => data,
                Err(e) => {
                    yield Err(anyhow!("Stream error: {}", e));
                    return;
                }
            };
            for event in decoder.push(&data) {
                match event {
                    SseEvent::Done => return,
                    SseEvent::Data(payload) => match serde_json::from_str::<StreamChunk>(&payload) {
                        Ok(chunk) => yield Ok(chunk),
                        Err(e) => {
                            yield Err(anyhow!("Failed to parse stream chunk '{}': {}", payload, e));
                            return;
                        }
                    },
                }
            }
        }
        for event in decoder.finish() {
            if let SseEvent::Data(payload) = event {
                match serde_json::from_str::<StreamChunk>(&payload) {
                    Ok(chunk) => yield Ok(chunk),
                    Err(e) => yield Err(anyhow!("Failed to parse stream chunk '{}': {}", payload, e)),
                }
            }
        }
    }))
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Data(String),
    Done,
}

/// Splits a byte stream into `data:` payloads. Lines may span network chunks.
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    fn finish(&mut self) -> Vec<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&String::from_utf8_lossy(&rest))
            .into_iter()
            .collect()
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let payload = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?.trim();
    if payload.is_empty() {
        None
    } else if payload == "[DONE]" {
        Some(SseEvent::Done)
    } else {
        Some(SseEvent::Data(payload.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn create_mock_tool_definitions() -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "search_jobs".to_string(),
            description: "Search LinkedIn jobs".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"keywords": {"type": "string"}},
                "required": ["keywords"]
            }),
        }]
    }

    fn user_messages(text: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::user(text)]
    }

    #[test]
    fn test_build_chat_request_with_tools() {
        let tools = create_mock_tool_definitions();
        let value =
            build_chat_request("gpt-test", user_messages("Hello"), Some(&tools), 0.3, false).unwrap();
        assert_eq!(value["model"], "gpt-test");
        assert_eq!(value["messages"], json!(user_messages("Hello")));
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "search_jobs");
        assert_eq!(value["tools"][0]["function"]["parameters"]["required"][0], "keywords");
        assert!((value["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert!(value.get("stream").is_none());
    }

    #[test]
    fn test_build_chat_request_no_tools_streaming() {
        let value = build_chat_request("gpt-test", user_messages("Hi"), None, 0.7, true).unwrap();
        assert!(value.get("tools").is_none());
        assert_eq!(value["stream"], true);
    }

    #[test]
    fn test_sse_decoder_handles_split_lines() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\":").is_empty());
        let events = decoder.push(b"1}\n\ndata: [DONE]\n\n");
        assert_eq!(
            events,
            vec![SseEvent::Data("{\"a\":1}".to_string()), SseEvent::Done]
        );
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_sse_decoder_ignores_comments_and_flushes_tail() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b": keep-alive\r\n").is_empty());
        assert!(decoder.push(b"data: {\"b\":2}").is_empty());
        assert_eq!(decoder.finish(), vec![SseEvent::Data("{\"b\":2}".to_string())]);
    }

    #[tokio::test]
    async fn test_get_chat_completion_success() {
        let server = MockServer::start_async().await;
        let body = build_chat_request("gpt-test", user_messages("Ping"), None, 0.7, false).unwrap();
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("Authorization", "Bearer sk-test")
                    .json_body(body.clone());
                then.status(200).json_body(json!({
                    "id": "chatcmpl-123",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": "Pong"}, "finish_reason": "stop"}]
                }));
            })
            .await;

        let client = Client::new();
        let endpoint = server.url("/v1/chat/completions");
        let result = get_chat_completion(&client, &endpoint, "sk-test", &body).await;
        mock.assert_async().await;
        let response = result.unwrap();
        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(response.choices[0].message.content.as_deref(), Some("Pong"));
    }

    #[tokio::test]
    async fn test_get_chat_completion_reports_status_without_retry() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(500).body("Server error");
            })
            .await;

        let client = Client::new();
        let body = build_chat_request("gpt-test", user_messages("Retry"), None, 0.7, false).unwrap();
        let result =
            get_chat_completion(&client, &server.url("/v1/chat/completions"), "k", &body).await;
        assert_eq!(mock.hits(), 1);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("API error: 500"), "{}", err);
    }

    #[tokio::test]
    async fn test_stream_chat_completion_yields_chunks() {
        let server = MockServer::start_async().await;
        let sse_body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"Three \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"jobs found\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body(sse_body);
            })
            .await;

        let client = Client::new();
        let body = build_chat_request("gpt-test", user_messages("Jobs?"), None, 0.7, true).unwrap();
        let stream = stream_chat_completion(&client, &server.url("/v1/chat/completions"), "k", &body)
            .await
            .unwrap();
        let chunks: Vec<StreamChunk> = stream.map(|c| c.unwrap()).collect().await;
        mock.assert_async().await;
        assert_eq!(chunks.len(), 3);
        let text: String = chunks
            .iter()
            .filter_map(|c| c.choices.first().and_then(|ch| ch.delta.content.clone()))
            .collect();
        assert_eq!(text, "Three jobs found");
    }

    #[tokio::test]
    async fn test_stream_chat_completion_fails_on_unauthorized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(401).body("invalid api key");
            })
            .await;

        let client = Client::new();
        let body = build_chat_request("gpt-test", user_messages("x"), None, 0.7, true).unwrap();
        let result =
            stream_chat_completion(&client, &server.url("/v1/chat/completions"), "bad", &body).await;
        let err = result.err().unwrap().to_string();
        assert!(err.contains("401"), "{}", err);
    }
}
