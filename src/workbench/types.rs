// src/workbench/types.rs
// Request/response records for the eight §4.8 orchestration operations.

use serde::{Deserialize, Serialize};

use crate::domain::{KeywordItem, Polarity, Prompt, PromptStatus, PromptVersion};
use crate::llm::provider::TokenUsage;
use crate::prompt_store::PromptListFilter;

#[derive(Debug, Clone, Deserialize)]
pub struct InterpretRequest {
    pub user_id: String,
    pub description: String,
    #[serde(default)]
    pub model_key: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct InterpretResponse {
    pub workspace_token: String,
    pub topic: String,
    pub positive: Vec<KeywordItem>,
    pub negative: Vec<KeywordItem>,
    pub confidence: Option<f64>,
    pub instructions: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AugmentRequest {
    pub user_id: String,
    pub topic: String,
    #[serde(default)]
    pub model_key: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub existing_positive: Vec<KeywordItem>,
    #[serde(default)]
    pub existing_negative: Vec<KeywordItem>,
    #[serde(default = "default_requested")]
    pub requested_positive: usize,
    #[serde(default = "default_requested")]
    pub requested_negative: usize,
    #[serde(default)]
    pub workspace_token: Option<String>,
}

fn default_requested() -> usize {
    5
}

#[derive(Debug, Clone, Serialize)]
pub struct AugmentResponse {
    pub positive: Vec<KeywordItem>,
    pub negative: Vec<KeywordItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddManualKeywordRequest {
    pub user_id: String,
    pub topic: String,
    pub word: String,
    #[serde(default)]
    pub polarity: Option<Polarity>,
    #[serde(default)]
    pub weight: Option<i64>,
    #[serde(default)]
    pub prompt_id: Option<i64>,
    #[serde(default)]
    pub workspace_token: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddManualKeywordResponse {
    pub keyword_id: i64,
    pub polarity: Polarity,
    pub word: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveWorkspaceKeywordRequest {
    pub user_id: String,
    pub word: String,
    pub polarity: Polarity,
    pub workspace_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncWorkspaceKeywordsRequest {
    pub user_id: String,
    pub workspace_token: String,
    pub positive: Vec<KeywordItem>,
    pub negative: Vec<KeywordItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub user_id: String,
    pub topic: String,
    #[serde(default)]
    pub model_key: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub prompt_id: Option<i64>,
    #[serde(default)]
    pub include_keyword_reference: bool,
    pub positive: Vec<KeywordItem>,
    #[serde(default)]
    pub negative: Vec<KeywordItem>,
    #[serde(default)]
    pub workspace_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub prompt: String,
    pub model: String,
    pub duration_ms: i64,
    pub usage: TokenUsage,
    pub positive_used: usize,
    pub negative_used: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveRequest {
    pub user_id: String,
    #[serde(default)]
    pub prompt_id: Option<i64>,
    pub topic: String,
    pub body: String,
    #[serde(default)]
    pub instructions: Option<String>,
    pub model: String,
    #[serde(default)]
    pub status: Option<PromptStatus>,
    #[serde(default)]
    pub publish: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub positive: Vec<KeywordItem>,
    #[serde(default)]
    pub negative: Vec<KeywordItem>,
    #[serde(default)]
    pub workspace_token: Option<String>,
    #[serde(default = "default_true")]
    pub enforce_publish_validation: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveResponse {
    pub prompt_id: i64,
    pub status: PromptStatus,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetPromptResponse {
    pub prompt: Prompt,
    pub workspace_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListPromptsResponse {
    pub prompts: Vec<Prompt>,
    pub total: i64,
}

pub type ListPromptsRequestFilter = PromptListFilter;

#[derive(Debug, Clone, Serialize)]
pub struct ListVersionsResponse {
    pub versions: Vec<PromptVersion>,
}
