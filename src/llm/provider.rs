// src/llm/provider.rs
// Uniform chat-completion interface behind which concrete providers (OpenAI-
// compatible, DeepSeek-compatible) are dispatched (§4.4).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Simple message format shared by all providers, generalized from the
/// teacher's `llm::provider::Message` (tool-call/thought-signature fields
/// dropped — tool calling is outside this spec's scope).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

/// A dispatch-ready chat-completion request. `model` defaults to the
/// credential's configured model when omitted by the caller (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: i64,
    pub output: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub tokens: TokenUsage,
    pub latency_ms: i64,
}

/// Errors a provider implementation may surface; the gateway maps these onto
/// `WorkbenchError::ModelInvocationFailed` at the service boundary.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("upstream rejected request ({status}): {body}")]
    UpstreamRejection { status: u16, body: String },

    #[error("upstream call failed: {0}")]
    UpstreamFailure(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Universal provider interface, generalized from the teacher's
/// `llm::provider::LlmProvider` trait (tool calling and streaming dropped —
/// not named by this spec).
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn chat(&self, request: ChatRequest) -> ProviderResult<ChatResponse>;
}
