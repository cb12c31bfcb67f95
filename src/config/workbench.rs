// src/config/workbench.rs
// Domain tunables: keyword/tag limits, version retention, workspace TTL,
// moderation gate, free-tier meter, model-call bound.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    pub keyword_limit: usize,
    pub keyword_max_length: usize,
    pub tag_limit: usize,
    pub tag_max_length: usize,
    pub version_retention: u32,
    pub workspace_ttl_secs: i64,
}

impl KeywordConfig {
    pub fn from_env() -> Self {
        Self {
            keyword_limit: super::helpers::env_parsed("WORKBENCH_KEYWORD_LIMIT", 10),
            keyword_max_length: super::helpers::env_parsed("WORKBENCH_KEYWORD_MAX_LENGTH", 32),
            tag_limit: super::helpers::env_parsed("WORKBENCH_TAG_LIMIT", 3),
            tag_max_length: super::helpers::env_parsed("WORKBENCH_TAG_MAX_LENGTH", 5),
            version_retention: super::helpers::env_parsed("WORKBENCH_VERSION_RETENTION", 3),
            workspace_ttl_secs: super::helpers::env_parsed("WORKBENCH_WORKSPACE_TTL_SECS", 1800),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub enabled: bool,
    pub model_key: String,
    pub api_key: String,
    pub base_url: String,
}

impl ModerationConfig {
    pub fn from_env() -> Self {
        let api_key = super::helpers::env_or("WORKBENCH_MODERATION_API_KEY", "");
        Self {
            enabled: super::helpers::env_bool("WORKBENCH_MODERATION_ENABLED", true) && !api_key.is_empty(),
            model_key: super::helpers::env_or("WORKBENCH_MODERATION_MODEL_KEY", "moderation-default"),
            api_key,
            base_url: super::helpers::env_or(
                "WORKBENCH_MODERATION_BASE_URL",
                "https://api.openai.com/v1",
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeTierConfig {
    pub enabled: bool,
    pub quota: i64,
    pub window_secs: i64,
    pub model_key: String,
    pub actual_model: String,
    pub api_key: String,
    pub base_url: String,
}

impl FreeTierConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: super::helpers::env_bool("WORKBENCH_FREE_TIER_ENABLED", true),
            quota: super::helpers::env_parsed("WORKBENCH_FREE_TIER_QUOTA", 10),
            window_secs: super::helpers::env_parsed("WORKBENCH_FREE_TIER_WINDOW_SECS", 86400),
            model_key: super::helpers::env_or("WORKBENCH_FREE_TIER_MODEL_KEY", "free-tier"),
            actual_model: super::helpers::env_or("WORKBENCH_FREE_TIER_ACTUAL_MODEL", "deepseek-chat"),
            api_key: super::helpers::env_or("WORKBENCH_FREE_TIER_API_KEY", ""),
            base_url: super::helpers::env_or(
                "WORKBENCH_FREE_TIER_BASE_URL",
                "https://api.deepseek.com/v1",
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelGatewayConfig {
    pub call_timeout_secs: u64,
    pub credential_encryption_key_b64: String,
}

impl ModelGatewayConfig {
    pub fn from_env() -> Self {
        Self {
            call_timeout_secs: super::helpers::env_parsed("WORKBENCH_MODEL_CALL_TIMEOUT_SECS", 35),
            credential_encryption_key_b64: super::helpers::require_env(
                "WORKBENCH_CREDENTIAL_ENCRYPTION_KEY",
            ),
        }
    }
}
