// src/domain.rs
// Core entities: Prompt, KeywordItem, Keyword, PromptVersion, WorkspaceSnapshot.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStatus {
    Draft,
    Published,
    Archived,
}

impl PromptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl std::str::FromStr for PromptStatus {
    type Err = crate::errors::WorkbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(crate::errors::WorkbenchError::validation(format!(
                "unknown prompt status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

impl std::str::FromStr for Polarity {
    type Err = crate::errors::WorkbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            other => Err(crate::errors::WorkbenchError::validation(format!(
                "unknown polarity: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordSource {
    Manual,
    Model,
    Local,
}

impl KeywordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Model => "model",
            Self::Local => "local",
        }
    }
}

impl std::str::FromStr for KeywordSource {
    type Err = crate::errors::WorkbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "model" => Ok(Self::Model),
            "local" => Ok(Self::Local),
            other => Err(crate::errors::WorkbenchError::validation(format!(
                "unknown keyword source: {other}"
            ))),
        }
    }
}

/// A keyword carried inside a Prompt/Workspace. While a workspace item has no
/// stable id (§9: "keyword identity across workspace and persisted phases"),
/// `keyword_id` distinguishes the two phases without a separate enum: `None`
/// (or `Some(0)`) means ephemeral, `Some(id>0)` means persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordItem {
    pub word: String,
    pub polarity: Polarity,
    #[serde(default = "default_weight")]
    pub weight: i64,
    pub source: KeywordSource,
    #[serde(default)]
    pub keyword_id: Option<i64>,
}

fn default_weight() -> i64 {
    5
}

impl KeywordItem {
    pub fn is_persisted(&self) -> bool {
        matches!(self.keyword_id, Some(id) if id > 0)
    }

    pub fn lower_word(&self) -> String {
        self.word.to_lowercase()
    }
}

/// Persistent KeywordStore row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Keyword {
    pub id: i64,
    pub user_id: String,
    pub topic: String,
    pub word: String,
    pub polarity: String,
    pub source: String,
    pub weight: i64,
    pub language: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Durable prompt row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: i64,
    pub user_id: String,
    pub topic: String,
    pub body: String,
    pub instructions: Option<String>,
    pub model: String,
    pub status: PromptStatus,
    pub tags: Vec<String>,
    pub positive: Vec<KeywordItem>,
    pub negative: Vec<KeywordItem>,
    pub latest_version_no: i64,
    pub published_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_favorited: bool,
    pub like_count: i64,
}

/// Immutable snapshot of a published prompt.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PromptVersionRow {
    pub id: i64,
    pub prompt_id: i64,
    pub version_no: i64,
    pub body: String,
    pub instructions: Option<String>,
    pub positive_keywords_json: String,
    pub negative_keywords_json: String,
    pub model: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptVersion {
    pub id: i64,
    pub prompt_id: i64,
    pub version_no: i64,
    pub body: String,
    pub instructions: Option<String>,
    pub positive: Vec<KeywordItem>,
    pub negative: Vec<KeywordItem>,
    pub model: String,
    pub created_at: i64,
}

/// Ephemeral, TTL'd editing-session scratchpad.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    pub topic: String,
    pub language: String,
    pub model_key: Option<String>,
    pub draft_body: String,
    pub draft_instructions: Option<String>,
    pub prompt_id: Option<i64>,
    pub status: Option<PromptStatus>,
    pub positive: Vec<KeywordItem>,
    pub negative: Vec<KeywordItem>,
}

impl WorkspaceSnapshot {
    pub fn new_empty(topic: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            language: language.into(),
            model_key: None,
            draft_body: String::new(),
            draft_instructions: None,
            prompt_id: None,
            status: None,
            positive: Vec::new(),
            negative: Vec::new(),
        }
    }

    pub fn keywords_mut(&mut self, polarity: Polarity) -> &mut Vec<KeywordItem> {
        match polarity {
            Polarity::Positive => &mut self.positive,
            Polarity::Negative => &mut self.negative,
        }
    }

    pub fn keywords(&self, polarity: Polarity) -> &Vec<KeywordItem> {
        match polarity {
            Polarity::Positive => &self.positive,
            Polarity::Negative => &self.negative,
        }
    }
}

/// A user's encrypted-at-rest credential for one `modelKey` (§3/§9 ambient
/// addition — the distilled spec only mentions the store, not its schema).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModelCredentialRow {
    pub id: i64,
    pub user_id: String,
    pub model_key: String,
    pub provider: String,
    pub encrypted_api_key: Vec<u8>,
    pub nonce: Vec<u8>,
    pub base_url: Option<String>,
    pub enabled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}
