// src/errors.rs
// Error taxonomy for the prompt workbench core

use thiserror::Error;

/// Workbench operation error. Variants carry the machine-readable kind and any
/// structured detail the caller needs (limit/count, retry-after, missing fields).
#[derive(Error, Debug)]
pub enum WorkbenchError {
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("{polarity} keyword limit exceeded: {count}/{limit}")]
    KeywordLimitExceeded {
        polarity: String,
        limit: usize,
        count: usize,
    },

    #[error("tag limit exceeded: {count}/{limit}")]
    TagLimitExceeded { limit: usize, count: usize },

    #[error("keyword already exists in workspace")]
    DuplicateKeyword,

    #[error("prompt not found")]
    PromptNotFound,

    #[error("prompt version not found")]
    PromptVersionNotFound,

    #[error("content rejected: {reason}")]
    ContentRejected { reason: String },

    #[error("free tier quota exceeded, retry after {retry_after}s")]
    FreeTierExceeded { retry_after: i64 },

    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: i64 },

    #[error("model invocation failed: {0}")]
    ModelInvocationFailed(String),

    #[error("no credential configured for model {model_key}")]
    CredentialNotFound { model_key: String },

    #[error("credential for model {model_key} is disabled")]
    CredentialDisabled { model_key: String },

    #[error("publish validation failed, missing: {missing_fields:?}")]
    PublishValidationError { missing_fields: Vec<String> },

    #[error("workspace not found or expired")]
    WorkspaceNotFound,

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl WorkbenchError {
    /// Stable machine code exposed to callers; never the Display message, which
    /// may change wording without notice (see `Internal`, which hides detail).
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationFailed(_) => "validation_failed",
            Self::KeywordLimitExceeded { .. } => "keyword_limit_exceeded",
            Self::TagLimitExceeded { .. } => "tag_limit_exceeded",
            Self::DuplicateKeyword => "duplicate_keyword",
            Self::PromptNotFound => "prompt_not_found",
            Self::PromptVersionNotFound => "prompt_version_not_found",
            Self::ContentRejected { .. } => "content_rejected",
            Self::FreeTierExceeded { .. } => "free_tier_exceeded",
            Self::RateLimited { .. } => "rate_limited",
            Self::ModelInvocationFailed(_) => "model_invocation_failed",
            Self::CredentialNotFound { .. } => "credential_not_found",
            Self::CredentialDisabled { .. } => "credential_disabled",
            Self::PublishValidationError { .. } => "publish_validation_error",
            Self::WorkspaceNotFound => "workspace_not_found",
            Self::Internal(_) => "internal",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

pub type Result<T> = std::result::Result<T, WorkbenchError>;

/// Extension trait mirroring the teacher's `IntoGitErrorResult`: converts any
/// displayable error into `WorkbenchError::Internal` with added context.
pub trait IntoWorkbenchErrorResult<T> {
    fn into_workbench_error(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoWorkbenchErrorResult<T> for std::result::Result<T, E> {
    fn into_workbench_error(self, context: &str) -> Result<T> {
        self.map_err(|e| WorkbenchError::Internal(anyhow::anyhow!("{}: {}", context, e)))
    }
}

impl From<sqlx::Error> for WorkbenchError {
    fn from(e: sqlx::Error) -> Self {
        WorkbenchError::Internal(e.into())
    }
}
