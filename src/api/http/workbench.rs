// src/api/http/workbench.rs
// Thin axum adapter over PromptWorkbenchService's eight §4.8 operations plus
// the CRUD read paths of §4.8.8. The wire format is explicitly out of scope
// (SPEC_FULL.md §1/§6) — this module exists only so the core is reachable;
// request binding is a direct Json<...Request> deserialize into the core's
// own request records, with no adapter-side validation duplicated from the
// service layer.
//
// Grounded on api/http/auth.rs's Router<Arc<AppState>> + handler shape.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::domain::PromptStatus;
use crate::prompt_store::PromptListFilter;
use crate::state::AppState;
use crate::workbench::types::*;

use super::super::error::ApiError;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/workbench/interpret", post(interpret))
        .route("/workbench/augment", post(augment))
        .route("/workbench/keywords/manual", post(add_manual_keyword))
        .route("/workbench/keywords/workspace", delete(remove_workspace_keyword))
        .route("/workbench/keywords/sync", post(sync_workspace_keywords))
        .route("/workbench/generate", post(generate))
        .route("/workbench/prompts", post(save))
        .route("/workbench/prompts", get(list_prompts))
        .route("/workbench/prompts/{id}", get(get_prompt))
        .route("/workbench/prompts/{id}", delete(delete_prompt))
        .route("/workbench/prompts/{id}/versions", get(list_versions))
        .route("/workbench/prompts/{id}/versions/{version_no}", get(get_version))
        .route("/workbench/prompts/{id}/favorite", put(update_favorite))
        .route("/workbench/prompts/{id}/like", post(like))
        .route("/workbench/prompts/{id}/like", delete(unlike))
}

async fn interpret(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InterpretRequest>,
) -> Result<Json<InterpretResponse>, ApiError> {
    Ok(Json(state.workbench.interpret(req).await?))
}

async fn augment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AugmentRequest>,
) -> Result<Json<AugmentResponse>, ApiError> {
    Ok(Json(state.workbench.augment_keywords(req).await?))
}

async fn add_manual_keyword(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddManualKeywordRequest>,
) -> Result<Json<AddManualKeywordResponse>, ApiError> {
    Ok(Json(state.workbench.add_manual_keyword(req).await?))
}

async fn remove_workspace_keyword(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RemoveWorkspaceKeywordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.workbench.remove_workspace_keyword(req).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn sync_workspace_keywords(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SyncWorkspaceKeywordsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.workbench.sync_workspace_keywords(req).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    Ok(Json(state.workbench.generate_prompt(req).await?))
}

async fn save(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    Ok(Json(state.workbench.save(req).await?))
}

#[derive(Debug, Deserialize)]
struct ListPromptsQuery {
    user_id: String,
    status: Option<PromptStatus>,
    query: Option<String>,
    #[serde(default)]
    favorited_only: bool,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_page_size")]
    page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

async fn list_prompts(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListPromptsQuery>,
) -> Result<Json<ListPromptsResponse>, ApiError> {
    let filter = PromptListFilter {
        status: q.status,
        query: q.query,
        favorited_only: q.favorited_only,
        page: q.page,
        page_size: q.page_size,
    };
    Ok(Json(state.workbench.list_prompts(&q.user_id, filter).await?))
}

#[derive(Debug, Deserialize)]
struct UserIdQuery {
    user_id: String,
}

async fn get_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(q): Query<UserIdQuery>,
) -> Result<Json<GetPromptResponse>, ApiError> {
    Ok(Json(state.workbench.get_prompt(&q.user_id, id).await?))
}

async fn delete_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(q): Query<UserIdQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.workbench.delete_prompt(&q.user_id, id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
struct ListVersionsQuery {
    user_id: String,
    #[serde(default = "default_versions_limit")]
    limit: i64,
}

fn default_versions_limit() -> i64 {
    20
}

async fn list_versions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(q): Query<ListVersionsQuery>,
) -> Result<Json<ListVersionsResponse>, ApiError> {
    Ok(Json(state.workbench.list_prompt_versions(&q.user_id, id, q.limit).await?))
}

async fn get_version(
    State(state): State<Arc<AppState>>,
    Path((id, version_no)): Path<(i64, i64)>,
    Query(q): Query<UserIdQuery>,
) -> Result<Json<crate::domain::PromptVersion>, ApiError> {
    Ok(Json(state.workbench.get_prompt_version_detail(&q.user_id, id, version_no).await?))
}

#[derive(Debug, Deserialize)]
struct FavoriteRequest {
    user_id: String,
    favorited: bool,
}

async fn update_favorite(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<FavoriteRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.workbench.update_favorite(&req.user_id, id, req.favorited).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn like(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(q): Json<UserIdQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.workbench.like(&q.user_id, id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn unlike(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(q): Query<UserIdQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.workbench.unlike(&q.user_id, id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
