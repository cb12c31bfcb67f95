// src/api/error.rs
// Maps the core's WorkbenchError taxonomy onto HTTP status codes and a
// stable {error, message, ...} JSON envelope. Wire format is out of scope
// per SPEC_FULL.md, but §7 requires a stable machine code and human message
// with no stack traces or internal identifiers — this is the thin adapter
// that honors that contract over HTTP.
//
// Grounded on api/http/auth.rs's local `AuthError` + `IntoResponse` idiom.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::errors::WorkbenchError;

pub struct ApiError(pub WorkbenchError);

impl From<WorkbenchError> for ApiError {
    fn from(e: WorkbenchError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = match &self.0 {
            WorkbenchError::ValidationFailed(_)
            | WorkbenchError::KeywordLimitExceeded { .. }
            | WorkbenchError::TagLimitExceeded { .. }
            | WorkbenchError::DuplicateKeyword
            | WorkbenchError::PublishValidationError { .. } => StatusCode::BAD_REQUEST,
            WorkbenchError::PromptNotFound
            | WorkbenchError::PromptVersionNotFound
            | WorkbenchError::WorkspaceNotFound => StatusCode::NOT_FOUND,
            WorkbenchError::ContentRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            WorkbenchError::FreeTierExceeded { .. } | WorkbenchError::RateLimited { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            WorkbenchError::CredentialNotFound { .. } | WorkbenchError::CredentialDisabled { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            WorkbenchError::ModelInvocationFailed(_) => StatusCode::BAD_GATEWAY,
            WorkbenchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if matches!(self.0, WorkbenchError::Internal(_)) {
            error!("internal workbench error: {:#}", self.0);
        }

        let message = match &self.0 {
            WorkbenchError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };

        let mut body = json!({ "error": code, "message": message });
        match &self.0 {
            WorkbenchError::KeywordLimitExceeded { polarity, limit, count } => {
                body["polarity"] = json!(polarity);
                body["limit"] = json!(limit);
                body["count"] = json!(count);
            }
            WorkbenchError::TagLimitExceeded { limit, count } => {
                body["limit"] = json!(limit);
                body["count"] = json!(count);
            }
            WorkbenchError::FreeTierExceeded { retry_after } | WorkbenchError::RateLimited { retry_after } => {
                body["retry_after"] = json!(retry_after);
            }
            WorkbenchError::PublishValidationError { missing_fields } => {
                body["missing_fields"] = json!(missing_fields);
            }
            WorkbenchError::ContentRejected { reason } => {
                body["reason"] = json!(reason);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
