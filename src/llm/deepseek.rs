// src/llm/deepseek.rs
// DeepSeek-compatible provider: same request shape as OpenAI, distinct base
// URL and model naming (deepseek-chat for chat/tool calls).
//
// Grounded on llm/provider/deepseek.rs's request/response handling, trimmed
// to the chat-only path (code generation and tool calling dropped).

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::provider::{ChatRequest, ChatResponse, ModelProvider, ProviderError, ProviderResult, ResponseFormat, TokenUsage};

pub struct DeepSeekProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl DeepSeekProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.deepseek.com/v1";

    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[async_trait]
impl ModelProvider for DeepSeekProvider {
    fn name(&self) -> &'static str {
        "deepseek"
    }

    async fn chat(&self, request: ChatRequest) -> ProviderResult<ChatResponse> {
        let started = Instant::now();

        let mut body = json!({
            "model": request.model,
            "messages": request.messages.iter().map(|m| json!({"role": m.role, "content": m.content})).collect::<Vec<_>>(),
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if matches!(request.response_format, Some(ResponseFormat::JsonObject)) {
            body["response_format"] = json!({"type": "json_object"});
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::UpstreamFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(ProviderError::UpstreamFailure(format!(
                    "deepseek {}: {}",
                    status, text
                )));
            }
            return Err(ProviderError::UpstreamRejection {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::UpstreamFailure(format!("malformed deepseek body: {e}")))?;

        debug!("deepseek response: {}", parsed);

        let content = parsed
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| ProviderError::UpstreamFailure("missing choices[0].message.content".into()))?
            .to_string();

        let usage = parsed.get("usage");
        let tokens = TokenUsage {
            input: usage.and_then(|u| u.get("prompt_tokens")).and_then(|v| v.as_i64()).unwrap_or(0),
            output: usage.and_then(|u| u.get("completion_tokens")).and_then(|v| v.as_i64()).unwrap_or(0),
        };

        Ok(ChatResponse {
            content,
            model: request.model,
            tokens,
            latency_ms: started.elapsed().as_millis() as i64,
        })
    }
}
