// src/llm/gateway.rs
// Credential resolution + decryption + provider dispatch, with the
// decoupled-but-bounded call context required by §4.4/§9.
//
// The teacher has no direct counterpart for the cancellation-decoupling
// pattern; it's realized per SPEC_FULL.md's own implementation note:
// tokio::spawn detaches the upstream call from the caller's future (so
// dropping the caller's future does not abort the spawned task), joined
// through tokio::time::timeout bounded by min(configured upper timeout,
// caller deadline remaining). Provider dispatch shape (credential ->
// concrete ModelProvider) is grounded on llm/router/mod.rs's
// route_with_fallback provider-selection idiom.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::credential_store::CredentialStore;
use super::deepseek::DeepSeekProvider;
use super::openai::OpenAiProvider;
use super::provider::{ChatRequest, ChatResponse, ModelProvider, ProviderError};
use crate::errors::{Result, WorkbenchError};

pub struct ModelGateway {
    credentials: Arc<CredentialStore>,
    call_timeout: Duration,
}

impl ModelGateway {
    pub fn new(credentials: Arc<CredentialStore>, call_timeout_secs: u64) -> Self {
        Self {
            credentials,
            call_timeout: Duration::from_secs(call_timeout_secs),
        }
    }

    /// `Invoke(ctx, userId, modelKey, request) -> response`, resolving the
    /// user's stored credential for `modelKey`.
    pub async fn invoke(
        &self,
        user_id: &str,
        model_key: &str,
        mut request: ChatRequest,
        caller_deadline: Option<Duration>,
    ) -> Result<ChatResponse> {
        let credential = self.credentials.resolve(user_id, model_key).await?;
        if request.model.is_empty() {
            request.model = model_key.to_string();
        }
        let provider = build_provider(&credential.provider, credential.api_key, credential.base_url)?;
        self.invoke_with_provider(provider, request, caller_deadline).await
    }

    /// Dispatches against a caller-supplied provider, bypassing per-user
    /// credential resolution. Used by ModerationGate and FreeTierMeter, whose
    /// credentials come from static config rather than the user's store.
    pub async fn invoke_with_provider(
        &self,
        provider: Arc<dyn ModelProvider>,
        request: ChatRequest,
        caller_deadline: Option<Duration>,
    ) -> Result<ChatResponse> {
        let bound = match caller_deadline {
            Some(d) if d < self.call_timeout => d,
            _ => self.call_timeout,
        };

        let handle = tokio::spawn(async move { provider.chat(request).await });

        match tokio::time::timeout(bound, handle).await {
            Ok(Ok(Ok(response))) => Ok(response),
            Ok(Ok(Err(provider_err))) => Err(map_provider_error(provider_err)),
            Ok(Err(join_err)) => {
                warn!("model call task failed to join: {join_err}");
                Err(WorkbenchError::internal(anyhow::anyhow!(
                    "model call task panicked: {join_err}"
                )))
            }
            Err(_) => Err(WorkbenchError::ModelInvocationFailed(
                "model call timed out".to_string(),
            )),
        }
    }
}

fn build_provider(
    provider_name: &str,
    api_key: String,
    base_url: Option<String>,
) -> Result<Arc<dyn ModelProvider>> {
    match provider_name {
        "openai" => Ok(Arc::new(OpenAiProvider::new(api_key, base_url))),
        "deepseek" => Ok(Arc::new(DeepSeekProvider::new(api_key, base_url))),
        other => Err(WorkbenchError::internal(anyhow::anyhow!(
            "unknown provider: {other}"
        ))),
    }
}

fn map_provider_error(err: ProviderError) -> WorkbenchError {
    match err {
        ProviderError::UpstreamRejection { status, body } => {
            WorkbenchError::ModelInvocationFailed(format!("rejected ({status}): {body}"))
        }
        ProviderError::UpstreamFailure(msg) => WorkbenchError::ModelInvocationFailed(msg),
    }
}
