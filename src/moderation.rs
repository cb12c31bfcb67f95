// src/moderation.rs
// Classifies text as allowed/rejected, backed by a model invocation under a
// fixed moderation model key (§4.5).
//
// Dispatches through the same ModelGateway/provider trait as everything
// else; the disabled-switch check is grounded on
// llm/provider/deepseek.rs's is_available() configured-switch pattern. The
// trait indirection (rather than a concrete struct) is grounded on
// SPEC_FULL.md's own test-tooling note naming a mock ModerationGate.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::workbench::ModerationConfig;
use crate::errors::Result;
use crate::llm::json_loose::extract_json_object;
use crate::llm::openai::OpenAiProvider;
use crate::llm::provider::{ChatRequest, Message, ResponseFormat};
use crate::llm::ModelGateway;

#[derive(Debug, Clone)]
pub struct ModerationVerdict {
    pub allowed: bool,
    pub reason: String,
}

#[async_trait]
pub trait ModerationGate: Send + Sync {
    async fn audit(&self, text: &str) -> Result<ModerationVerdict>;
}

const SYSTEM_PROMPT: &str = "You are a content moderation classifier. Given a piece of text, \
    respond with ONLY a JSON object: {\"allowed\": true|false, \"reason\": \"short explanation\"}. \
    Reject text that requests disallowed, harmful, or abusive content.";

pub struct GatewayModerationGate {
    gateway: Arc<ModelGateway>,
    config: ModerationConfig,
}

impl GatewayModerationGate {
    pub fn new(gateway: Arc<ModelGateway>, config: ModerationConfig) -> Self {
        Self { gateway, config }
    }
}

#[async_trait]
impl ModerationGate for GatewayModerationGate {
    async fn audit(&self, text: &str) -> Result<ModerationVerdict> {
        if !self.config.enabled {
            return Ok(ModerationVerdict {
                allowed: true,
                reason: String::new(),
            });
        }

        let provider = Arc::new(OpenAiProvider::new(
            self.config.api_key.clone(),
            Some(self.config.base_url.clone()),
        ));

        let request = ChatRequest {
            model: self.config.model_key.clone(),
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(text)],
            temperature: Some(0.0),
            max_tokens: Some(200),
            response_format: Some(ResponseFormat::JsonObject),
        };

        let response = self
            .gateway
            .invoke_with_provider(provider, request, None)
            .await?;

        let parsed = extract_json_object(&response.content)?;
        let allowed = parsed.get("allowed").and_then(|a| a.as_bool()).unwrap_or(true);
        let reason = parsed
            .get("reason")
            .and_then(|r| r.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(ModerationVerdict { allowed, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysAllow;

    #[async_trait]
    impl ModerationGate for AlwaysAllow {
        async fn audit(&self, _text: &str) -> Result<ModerationVerdict> {
            Ok(ModerationVerdict {
                allowed: true,
                reason: String::new(),
            })
        }
    }

    struct AlwaysReject(&'static str);

    #[async_trait]
    impl ModerationGate for AlwaysReject {
        async fn audit(&self, _text: &str) -> Result<ModerationVerdict> {
            Ok(ModerationVerdict {
                allowed: false,
                reason: self.0.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn disabled_gate_always_allows() {
        let gateway = Arc::new(ModelGateway::new(
            Arc::new(
                crate::llm::CredentialStore::new(
                    sqlx::sqlite::SqlitePoolOptions::new()
                        .connect(":memory:")
                        .await
                        .unwrap(),
                    &{
                        use base64::Engine;
                        base64::engine::general_purpose::STANDARD.encode([1u8; 32])
                    },
                )
                .unwrap(),
            ),
            35,
        ));
        let gate = GatewayModerationGate::new(
            gateway,
            ModerationConfig {
                enabled: false,
                model_key: "moderation-default".to_string(),
                api_key: String::new(),
                base_url: "https://api.openai.com/v1".to_string(),
            },
        );
        let verdict = gate.audit("anything").await.unwrap();
        assert!(verdict.allowed);
    }

    #[tokio::test]
    async fn mock_gate_surfaces_rejection_reason() {
        let gate = AlwaysReject("contains disallowed content");
        let verdict = gate.audit("banned content").await.unwrap();
        assert!(!verdict.allowed);
        assert_eq!(verdict.reason, "contains disallowed content");
    }

    #[tokio::test]
    async fn mock_gate_allows_by_default() {
        let gate = AlwaysAllow;
        let verdict = gate.audit("hello").await.unwrap();
        assert!(verdict.allowed);
    }
}
