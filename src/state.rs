// src/state.rs
// Application state shared across handlers: aggregates every component
// wired from §4 into the one PromptWorkbenchService the HTTP adapter calls.
//
// Grounded on the teacher's state.rs service-aggregation style: a single
// Clone-able struct holding Arc<...> services, built by an async
// `AppState::new(pool)` constructor that logs each stage as it wires up.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use crate::config::CONFIG;
use crate::errors::Result;
use crate::free_tier::FreeTierMeter;
use crate::keyword_store::KeywordStore;
use crate::llm::{CredentialStore, ModelGateway};
use crate::moderation::{GatewayModerationGate, ModerationGate};
use crate::prompt_store::PromptStore;
use crate::rate_limit::RateLimiter;
use crate::workbench::service::PromptWorkbenchService;
use crate::workspace::WorkspaceCache;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sqlite_pool: SqlitePool,
    pub workbench: Arc<PromptWorkbenchService>,
}

impl AppState {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        info!("wiring prompt workbench services");

        let keywords = Arc::new(KeywordStore::new(pool.clone()));
        info!("keyword store ready");

        let prompts = Arc::new(PromptStore::new(pool.clone()));
        info!("prompt store ready");

        let workspace = WorkspaceCache::new();
        info!("workspace cache ready (ttl={}s)", CONFIG.keywords.workspace_ttl_secs);

        let credentials = Arc::new(CredentialStore::new(
            pool.clone(),
            &CONFIG.model_gateway.credential_encryption_key_b64,
        )?);
        let gateway = Arc::new(ModelGateway::new(
            credentials,
            CONFIG.model_gateway.call_timeout_secs,
        ));
        info!("model gateway ready");

        let moderation: Arc<dyn ModerationGate> = Arc::new(GatewayModerationGate::new(
            gateway.clone(),
            CONFIG.moderation.clone(),
        ));
        info!("moderation gate ready (enabled={})", CONFIG.moderation.enabled);

        let free_tier = Arc::new(FreeTierMeter::new(
            pool.clone(),
            CONFIG.free_tier.quota,
            CONFIG.free_tier.window_secs,
        ));
        info!("free-tier meter ready (enabled={})", CONFIG.free_tier.enabled);

        let rate_limiter = Arc::new(RateLimiter::new());
        info!("rate limiter ready");

        let workbench = Arc::new(PromptWorkbenchService::new(
            workspace,
            keywords,
            prompts,
            gateway,
            moderation,
            free_tier,
            rate_limiter,
        ));

        Ok(Self {
            sqlite_pool: pool,
            workbench,
        })
    }
}
