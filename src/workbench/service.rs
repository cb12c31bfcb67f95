// src/workbench/service.rs
// PromptWorkbenchService: orchestration of all eight §4.8 operations.
//
// Grounded on state.rs's AppState service-aggregation-and-wiring style and
// llm/router/mod.rs's route_with_fallback shape for the free-tier branch
// shared by Interpret/Generate.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::config::CONFIG;
use crate::domain::{KeywordItem, KeywordSource, Polarity, Prompt, PromptStatus, PromptVersion, WorkspaceSnapshot};
use crate::errors::{Result, WorkbenchError};
use crate::free_tier::FreeTierMeter;
use crate::keyword_store::KeywordStore;
use crate::llm::openai::OpenAiProvider;
use crate::llm::provider::{ChatRequest, Message, ResponseFormat};
use crate::llm::json_loose::parse_interpret_result;
use crate::llm::ModelGateway;
use crate::moderation::ModerationGate;
use crate::prompt_store::{PromptListFilter, PromptStore};
use crate::rate_limit::RateLimiter;
use crate::workspace::WorkspaceCache;

use super::interpret::{build_augment_messages, build_generate_messages, build_interpret_messages, GenerateContext};
use super::text::{clamp_weight, code_point_len, dedup_keywords, normalize_topic, sanitize_tags, truncate_code_points};
use super::types::*;

pub struct PromptWorkbenchService {
    pub workspace: Arc<WorkspaceCache>,
    pub keywords: Arc<KeywordStore>,
    pub prompts: Arc<PromptStore>,
    pub gateway: Arc<ModelGateway>,
    pub moderation: Arc<dyn ModerationGate>,
    pub free_tier: Arc<FreeTierMeter>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl PromptWorkbenchService {
    pub fn new(
        workspace: Arc<WorkspaceCache>,
        keywords: Arc<KeywordStore>,
        prompts: Arc<PromptStore>,
        gateway: Arc<ModelGateway>,
        moderation: Arc<dyn ModerationGate>,
        free_tier: Arc<FreeTierMeter>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            workspace,
            keywords,
            prompts,
            gateway,
            moderation,
            free_tier,
            rate_limiter,
        }
    }

    /// Moderation-gate internal errors are non-fatal and open-fail (§7):
    /// a transient moderation-model outage must not block a legitimate
    /// interpret/generate call. Only an explicit `allowed=false` verdict
    /// yields `ContentRejected`.
    async fn moderate(&self, text: &str) -> Result<()> {
        match self.moderation.audit(text).await {
            Ok(verdict) if !verdict.allowed => Err(WorkbenchError::ContentRejected { reason: verdict.reason }),
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("moderation gate error, treating as allowed: {e}");
                Ok(())
            }
        }
    }

    async fn consume_bucket(&self, operation: &str, user_id: &str, limit: u32, window_secs: u64) -> Result<()> {
        let decision = self
            .rate_limiter
            .allow(operation, user_id, limit, Duration::from_secs(window_secs))
            .await;
        if !decision.allowed {
            return Err(WorkbenchError::RateLimited {
                retry_after: decision.retry_after,
            });
        }
        Ok(())
    }

    fn check_keyword_limit(items: &[KeywordItem], polarity: Polarity) -> Result<()> {
        if items.len() > CONFIG.keywords.keyword_limit {
            return Err(WorkbenchError::KeywordLimitExceeded {
                polarity: polarity.as_str().to_string(),
                limit: CONFIG.keywords.keyword_limit,
                count: items.len(),
            });
        }
        Ok(())
    }

    fn check_word_lengths(items: &[KeywordItem]) -> Result<()> {
        for item in items {
            if code_point_len(&item.word) > CONFIG.keywords.keyword_max_length {
                return Err(WorkbenchError::validation(format!(
                    "keyword '{}' exceeds max length {}",
                    item.word, CONFIG.keywords.keyword_max_length
                )));
            }
        }
        Ok(())
    }

    /// Dispatches through ModelGateway, falling back to the free-tier model
    /// only when the caller supplied no explicit `modelKey` and the primary
    /// attempt fails with CredentialNotFound/CredentialDisabled (§4.6).
    async fn invoke_with_fallback(
        &self,
        user_id: &str,
        model_key: &Option<String>,
        request: ChatRequest,
    ) -> Result<crate::llm::provider::ChatResponse> {
        let explicit = model_key.as_deref().filter(|k| !k.is_empty());
        let key_to_try = explicit.unwrap_or("");

        match self
            .gateway
            .invoke(user_id, key_to_try, request.clone(), None)
            .await
        {
            Ok(response) => Ok(response),
            Err(WorkbenchError::CredentialNotFound { .. } | WorkbenchError::CredentialDisabled { .. })
                if explicit.is_none() =>
            {
                self.invoke_free_tier(user_id, request).await
            }
            Err(e) => Err(e),
        }
    }

    async fn invoke_free_tier(&self, user_id: &str, mut request: ChatRequest) -> Result<crate::llm::provider::ChatResponse> {
        if !CONFIG.free_tier.enabled {
            return Err(WorkbenchError::CredentialNotFound {
                model_key: String::new(),
            });
        }
        let status = self.free_tier.try_consume(user_id).await?;
        if !status.allowed {
            return Err(WorkbenchError::FreeTierExceeded {
                retry_after: status.retry_after,
            });
        }
        request.model = CONFIG.free_tier.actual_model.clone();
        let provider = Arc::new(OpenAiProvider::new(
            CONFIG.free_tier.api_key.clone(),
            Some(CONFIG.free_tier.base_url.clone()),
        ));
        self.gateway.invoke_with_provider(provider, request, None).await
    }

    // ---------------------------------------------------------------- 4.8.1

    pub async fn interpret(&self, req: InterpretRequest) -> Result<InterpretResponse> {
        if req.description.trim().is_empty() {
            return Err(WorkbenchError::validation("description must not be empty"));
        }
        self.consume_bucket(
            "interpret",
            &req.user_id,
            CONFIG.rate_limit.interpret.limit,
            CONFIG.rate_limit.interpret.window_secs,
        )
        .await?;

        self.moderate(&req.description).await?;

        let messages = build_interpret_messages(&req.description, &req.language);
        let request = ChatRequest {
            model: String::new(),
            messages,
            temperature: Some(0.7),
            max_tokens: Some(1200),
            response_format: Some(ResponseFormat::JsonObject),
        };

        let response = self.invoke_with_fallback(&req.user_id, &req.model_key, request).await?;
        let parsed = parse_interpret_result(&response.content)?;

        let positive_raw: Vec<KeywordItem> = parsed
            .positive_keywords
            .into_iter()
            .map(|k| super::text::keyword_item(k.word, Polarity::Positive, k.weight, KeywordSource::Model))
            .collect();
        let negative_raw: Vec<KeywordItem> = parsed
            .negative_keywords
            .into_iter()
            .map(|k| super::text::keyword_item(k.word, Polarity::Negative, k.weight, KeywordSource::Model))
            .collect();

        let positive = dedup_keywords(positive_raw, CONFIG.keywords.keyword_limit, CONFIG.keywords.keyword_max_length);
        let negative = dedup_keywords(negative_raw, CONFIG.keywords.keyword_limit, CONFIG.keywords.keyword_max_length);
        let tags = sanitize_tags(&parsed.tags, CONFIG.keywords.tag_limit, CONFIG.keywords.tag_max_length);

        let topic = if parsed.topic.trim().is_empty() {
            req.description.chars().take(64).collect()
        } else {
            parsed.topic.clone()
        };

        for item in positive.iter().chain(negative.iter()) {
            self.keywords
                .upsert(
                    &req.user_id,
                    &topic,
                    &item.word,
                    item.polarity.as_str(),
                    item.weight,
                    item.source.as_str(),
                    &req.language,
                )
                .await?;
        }

        let mut snapshot = WorkspaceSnapshot::new_empty(topic.clone(), req.language.clone());
        snapshot.model_key = req.model_key.clone();
        snapshot.draft_instructions = parsed.instructions.clone();
        snapshot.positive = positive.clone();
        snapshot.negative = negative.clone();
        let workspace_token = self.workspace.create_or_replace(&req.user_id, snapshot).await;

        Ok(InterpretResponse {
            workspace_token,
            topic,
            positive,
            negative,
            confidence: parsed.confidence,
            instructions: parsed.instructions,
            tags,
        })
    }

    // ---------------------------------------------------------------- 4.8.2

    pub async fn augment_keywords(&self, req: AugmentRequest) -> Result<AugmentResponse> {
        Self::check_keyword_limit(&req.existing_positive, Polarity::Positive)?;
        Self::check_keyword_limit(&req.existing_negative, Polarity::Negative)?;

        let messages = build_augment_messages(
            &req.topic,
            &req.existing_positive,
            &req.existing_negative,
            req.requested_positive,
            req.requested_negative,
            &req.language,
        );
        let request = ChatRequest {
            model: String::new(),
            messages,
            temperature: Some(0.8),
            max_tokens: Some(600),
            response_format: Some(ResponseFormat::JsonObject),
        };

        let response = self.invoke_with_fallback(&req.user_id, &req.model_key, request).await?;
        let value = crate::llm::json_loose::extract_json_object(&response.content)?;

        let parse_list = |field: &str, polarity: Polarity| -> Vec<KeywordItem> {
            value
                .get(field)
                .and_then(|v| v.as_array())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| {
                            let word = item.get("word").and_then(|w| w.as_str())?.to_string();
                            let weight = item
                                .get("weight")
                                .and_then(|w| w.as_i64().or_else(|| w.as_f64().map(|f| f.round() as i64)));
                            Some(super::text::keyword_item(word, polarity, weight, KeywordSource::Model))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        let suggested_positive = parse_list("positive_keywords", Polarity::Positive);
        let suggested_negative = parse_list("negative_keywords", Polarity::Negative);

        let existing_positive_lower: std::collections::HashSet<String> =
            req.existing_positive.iter().map(|k| k.lower_word()).collect();
        let existing_negative_lower: std::collections::HashSet<String> =
            req.existing_negative.iter().map(|k| k.lower_word()).collect();

        let mut positive: Vec<KeywordItem> = suggested_positive
            .into_iter()
            .filter(|k| !existing_positive_lower.contains(&k.lower_word()))
            .collect();
        let mut negative: Vec<KeywordItem> = suggested_negative
            .into_iter()
            .filter(|k| !existing_negative_lower.contains(&k.lower_word()))
            .collect();

        positive = dedup_keywords(positive, CONFIG.keywords.keyword_limit, CONFIG.keywords.keyword_max_length);
        negative = dedup_keywords(negative, CONFIG.keywords.keyword_limit, CONFIG.keywords.keyword_max_length);

        let remaining_positive = CONFIG.keywords.keyword_limit.saturating_sub(req.existing_positive.len());
        let remaining_negative = CONFIG.keywords.keyword_limit.saturating_sub(req.existing_negative.len());
        positive.truncate(remaining_positive);
        negative.truncate(remaining_negative);

        for item in positive.iter().chain(negative.iter()) {
            self.keywords
                .upsert(
                    &req.user_id,
                    &req.topic,
                    &item.word,
                    item.polarity.as_str(),
                    item.weight,
                    item.source.as_str(),
                    &req.language,
                )
                .await?;
        }

        if let Some(token) = &req.workspace_token {
            self.workspace
                .merge_keywords(&req.user_id, token, positive.iter().chain(negative.iter()).cloned().collect())
                .await?;
        }

        Ok(AugmentResponse { positive, negative })
    }

    // ---------------------------------------------------------------- 4.8.3

    pub async fn add_manual_keyword(&self, req: AddManualKeywordRequest) -> Result<AddManualKeywordResponse> {
        let word = req.word.trim().to_string();
        if word.is_empty() {
            return Err(WorkbenchError::validation("word must not be empty"));
        }
        if code_point_len(&word) > CONFIG.keywords.keyword_max_length {
            return Err(WorkbenchError::validation(format!(
                "word exceeds max length {}",
                CONFIG.keywords.keyword_max_length
            )));
        }
        let polarity = req.polarity.unwrap_or(Polarity::Positive);
        let weight = clamp_weight(req.weight);

        if let Some(token) = &req.workspace_token {
            let snapshot = self.workspace.snapshot(&req.user_id, token).await?;
            let lower = word.to_lowercase();
            let bucket = snapshot.keywords(polarity);
            if bucket.iter().any(|k| k.lower_word() == lower) {
                return Err(WorkbenchError::DuplicateKeyword);
            }
            if bucket.len() >= CONFIG.keywords.keyword_limit {
                return Err(WorkbenchError::KeywordLimitExceeded {
                    polarity: polarity.as_str().to_string(),
                    limit: CONFIG.keywords.keyword_limit,
                    count: bucket.len(),
                });
            }
            let item = KeywordItem {
                word: word.clone(),
                polarity,
                weight,
                source: KeywordSource::Manual,
                keyword_id: None,
            };
            self.workspace.merge_keywords(&req.user_id, token, vec![item]).await?;
            return Ok(AddManualKeywordResponse {
                keyword_id: 0,
                polarity,
                word,
            });
        }

        if let Some(prompt_id) = req.prompt_id {
            let mut tx = self.prompts.begin().await?;
            let keyword_id = self
                .keywords
                .upsert_in(
                    &mut *tx,
                    &req.user_id,
                    &req.topic,
                    &word,
                    polarity.as_str(),
                    weight,
                    KeywordSource::Manual.as_str(),
                    &req.language,
                )
                .await?;

            let mut prompt = self.prompts.find_by_id_in(&mut *tx, &req.user_id, prompt_id).await?;
            let lower = word.to_lowercase();
            let bucket = match polarity {
                Polarity::Positive => &mut prompt.positive,
                Polarity::Negative => &mut prompt.negative,
            };
            if bucket.iter().any(|k| k.lower_word() == lower) {
                return Err(WorkbenchError::DuplicateKeyword);
            }
            if bucket.len() >= CONFIG.keywords.keyword_limit {
                return Err(WorkbenchError::KeywordLimitExceeded {
                    polarity: polarity.as_str().to_string(),
                    limit: CONFIG.keywords.keyword_limit,
                    count: bucket.len(),
                });
            }
            bucket.push(KeywordItem {
                word: word.clone(),
                polarity,
                weight,
                source: KeywordSource::Manual,
                keyword_id: Some(keyword_id),
            });
            prompt.updated_at = Utc::now().timestamp();
            self.prompts.update_in(&mut *tx, &prompt).await?;

            let positive_ids: Vec<i64> = prompt.positive.iter().filter_map(|k| k.keyword_id).collect();
            let negative_ids: Vec<i64> = prompt.negative.iter().filter_map(|k| k.keyword_id).collect();
            self.prompts
                .replace_prompt_keywords(&mut tx, prompt_id, &positive_ids, &negative_ids)
                .await?;
            tx.commit().await.map_err(WorkbenchError::from)?;

            return Ok(AddManualKeywordResponse {
                keyword_id,
                polarity,
                word,
            });
        }

        let keyword_id = self
            .keywords
            .upsert(
                &req.user_id,
                &req.topic,
                &word,
                polarity.as_str(),
                weight,
                KeywordSource::Manual.as_str(),
                &req.language,
            )
            .await?;

        Ok(AddManualKeywordResponse {
            keyword_id,
            polarity,
            word,
        })
    }

    // ---------------------------------------------------------------- 4.8.4

    pub async fn remove_workspace_keyword(&self, req: RemoveWorkspaceKeywordRequest) -> Result<()> {
        self.workspace
            .remove_keyword(&req.user_id, &req.workspace_token, req.polarity, &req.word)
            .await
    }

    // ---------------------------------------------------------------- 4.8.5

    pub async fn sync_workspace_keywords(&self, req: SyncWorkspaceKeywordsRequest) -> Result<()> {
        Self::check_keyword_limit(&req.positive, Polarity::Positive)?;
        Self::check_keyword_limit(&req.negative, Polarity::Negative)?;
        Self::check_word_lengths(&req.positive)?;
        Self::check_word_lengths(&req.negative)?;

        self.workspace
            .replace_keywords(&req.user_id, &req.workspace_token, Polarity::Positive, req.positive)
            .await?;
        self.workspace
            .replace_keywords(&req.user_id, &req.workspace_token, Polarity::Negative, req.negative)
            .await?;
        Ok(())
    }

    // ---------------------------------------------------------------- 4.8.6

    pub async fn generate_prompt(&self, req: GenerateRequest) -> Result<GenerateResponse> {
        if req.positive.is_empty() {
            return Err(WorkbenchError::validation("at least one positive keyword is required"));
        }
        self.consume_bucket(
            "generate",
            &req.user_id,
            CONFIG.rate_limit.generate.limit,
            CONFIG.rate_limit.generate.window_secs,
        )
        .await?;

        Self::check_keyword_limit(&req.positive, Polarity::Positive)?;
        Self::check_keyword_limit(&req.negative, Polarity::Negative)?;
        Self::check_word_lengths(&req.positive)?;
        Self::check_word_lengths(&req.negative)?;

        let ctx = GenerateContext {
            topic: &req.topic,
            positive: &req.positive,
            negative: &req.negative,
            tone: req.tone.as_deref(),
            instructions: req.instructions.as_deref(),
            language: &req.language,
            include_keyword_reference: req.include_keyword_reference,
        };
        let messages = build_generate_messages(&ctx);
        let request = ChatRequest {
            model: String::new(),
            messages,
            temperature: req.temperature.or(Some(0.9)),
            max_tokens: req.max_tokens.or(Some(1500)),
            response_format: Some(ResponseFormat::Text),
        };

        let response = self.invoke_with_fallback(&req.user_id, &req.model_key, request).await?;

        self.moderate(&response.content).await?;

        if let Some(token) = &req.workspace_token {
            self.workspace
                .update_draft_body(&req.user_id, token, response.content.clone())
                .await?;
        }

        Ok(GenerateResponse {
            prompt: response.content,
            model: response.model,
            duration_ms: response.latency_ms,
            usage: response.tokens,
            positive_used: req.positive.len(),
            negative_used: req.negative.len(),
        })
    }

    // ---------------------------------------------------------------- 4.8.7

    pub async fn save(&self, mut req: SaveRequest) -> Result<SaveResponse> {
        self.consume_bucket(
            "save",
            &req.user_id,
            CONFIG.rate_limit.save.limit,
            CONFIG.rate_limit.save.window_secs,
        )
        .await?;
        if req.publish {
            self.consume_bucket(
                "publish",
                &req.user_id,
                CONFIG.rate_limit.publish.limit,
                CONFIG.rate_limit.publish.window_secs,
            )
            .await?;
        }

        req.tags = sanitize_tags(&req.tags, CONFIG.keywords.tag_limit, CONFIG.keywords.tag_max_length);
        req.topic = normalize_topic(req.topic.trim());

        if let Some(token) = &req.workspace_token {
            if let Ok(snapshot) = self.workspace.snapshot(&req.user_id, token).await {
                if req.positive.is_empty() {
                    req.positive = snapshot.positive;
                }
                if req.negative.is_empty() {
                    req.negative = snapshot.negative;
                }
                if req.instructions.is_none() {
                    req.instructions = snapshot.draft_instructions;
                }
                if req.body.is_empty() {
                    req.body = snapshot.draft_body;
                }
            }
        }

        Self::check_keyword_limit(&req.positive, Polarity::Positive)?;
        Self::check_keyword_limit(&req.negative, Polarity::Negative)?;
        Self::check_word_lengths(&req.positive)?;
        Self::check_word_lengths(&req.negative)?;

        let publishing = req.publish || matches!(req.status, Some(PromptStatus::Published));
        if publishing && req.enforce_publish_validation {
            let mut missing = Vec::new();
            if req.topic.is_empty() {
                missing.push("topic".to_string());
            }
            if req.body.is_empty() {
                missing.push("body".to_string());
            }
            if req.instructions.as_deref().unwrap_or("").is_empty() {
                missing.push("instructions".to_string());
            }
            if req.model.is_empty() {
                missing.push("model".to_string());
            }
            if req.positive.is_empty() {
                missing.push("positive".to_string());
            }
            if req.negative.is_empty() {
                missing.push("negative".to_string());
            }
            if req.tags.is_empty() {
                missing.push("tags".to_string());
            }
            if !missing.is_empty() {
                return Err(WorkbenchError::PublishValidationError { missing_fields: missing });
            }
        }

        let now = Utc::now().timestamp();
        let mut tx = self.prompts.begin().await?;

        let mut positive_resolved = Vec::with_capacity(req.positive.len());
        for item in &req.positive {
            let id = self
                .keywords
                .upsert_in(&mut *tx, &req.user_id, &req.topic, &item.word, Polarity::Positive.as_str(), item.weight, item.source.as_str(), "en")
                .await?;
            let mut resolved = item.clone();
            resolved.keyword_id = Some(id);
            positive_resolved.push(resolved);
        }
        let mut negative_resolved = Vec::with_capacity(req.negative.len());
        for item in &req.negative {
            let id = self
                .keywords
                .upsert_in(&mut *tx, &req.user_id, &req.topic, &item.word, Polarity::Negative.as_str(), item.weight, item.source.as_str(), "en")
                .await?;
            let mut resolved = item.clone();
            resolved.keyword_id = Some(id);
            negative_resolved.push(resolved);
        }

        let positive_ids: Vec<i64> = positive_resolved.iter().filter_map(|k| k.keyword_id).collect();
        let negative_ids: Vec<i64> = negative_resolved.iter().filter_map(|k| k.keyword_id).collect();

        let status = if publishing {
            PromptStatus::Published
        } else {
            req.status.unwrap_or(PromptStatus::Draft)
        };

        let prompt_id = match req.prompt_id {
            Some(id) => {
                let mut existing = self.prompts.find_by_id_in(&mut *tx, &req.user_id, id).await?;
                existing.topic = req.topic.clone();
                existing.body = req.body.clone();
                existing.instructions = req.instructions.clone();
                existing.model = req.model.clone();
                existing.status = status;
                existing.tags = req.tags.clone();
                existing.positive = positive_resolved.clone();
                existing.negative = negative_resolved.clone();
                existing.updated_at = now;
                self.prompts.update_in(&mut *tx, &existing).await?;
                id
            }
            None => {
                let prompt = Prompt {
                    id: 0,
                    user_id: req.user_id.clone(),
                    topic: req.topic.clone(),
                    body: req.body.clone(),
                    instructions: req.instructions.clone(),
                    model: req.model.clone(),
                    status,
                    tags: req.tags.clone(),
                    positive: positive_resolved.clone(),
                    negative: negative_resolved.clone(),
                    latest_version_no: 0,
                    published_at: None,
                    created_at: now,
                    updated_at: now,
                    is_favorited: false,
                    like_count: 0,
                };
                self.prompts.create_in(&mut *tx, &prompt).await?
            }
        };

        self.prompts
            .replace_prompt_keywords(&mut tx, prompt_id, &positive_ids, &negative_ids)
            .await?;

        let mut version_no = 0;
        if publishing {
            let max_existing = self.prompts.max_version_no(&mut tx, prompt_id).await?;
            version_no = max_existing.max(0) + 1;

            let version = PromptVersion {
                id: 0,
                prompt_id,
                version_no,
                body: req.body.clone(),
                instructions: req.instructions.clone(),
                positive: positive_resolved.clone(),
                negative: negative_resolved.clone(),
                model: req.model.clone(),
                created_at: now,
            };
            self.prompts.create_version(&mut tx, &version).await?;
            self.prompts
                .prune_versions(&mut tx, prompt_id, CONFIG.keywords.version_retention)
                .await?;

            let mut published = self.prompts.find_by_id_in(&mut *tx, &req.user_id, prompt_id).await?;
            published.latest_version_no = version_no;
            if published.published_at.is_none() {
                published.published_at = Some(now);
            }
            published.status = PromptStatus::Published;
            self.prompts.update_in(&mut *tx, &published).await?;
        }

        tx.commit().await.map_err(WorkbenchError::from)?;

        if let Some(token) = &req.workspace_token {
            let _ = self.workspace.set_prompt_meta(&req.user_id, token, prompt_id, status).await;
        }

        Ok(SaveResponse {
            prompt_id,
            status,
            version: version_no,
        })
    }

    // ---------------------------------------------------------------- 4.8.8

    pub async fn list_prompts(&self, user_id: &str, filter: PromptListFilter) -> Result<ListPromptsResponse> {
        let (prompts, total) = self.prompts.list_by_user(user_id, &filter).await?;
        Ok(ListPromptsResponse { prompts, total })
    }

    pub async fn get_prompt(&self, user_id: &str, prompt_id: i64) -> Result<GetPromptResponse> {
        let prompt = self.prompts.find_by_id(user_id, prompt_id).await?;
        let mut snapshot = WorkspaceSnapshot::new_empty(prompt.topic.clone(), "en");
        snapshot.draft_body = prompt.body.clone();
        snapshot.draft_instructions = prompt.instructions.clone();
        snapshot.prompt_id = Some(prompt.id);
        snapshot.status = Some(prompt.status);
        snapshot.positive = prompt.positive.clone();
        snapshot.negative = prompt.negative.clone();
        snapshot.model_key = Some(prompt.model.clone());
        let workspace_token = self.workspace.create_or_replace(user_id, snapshot).await;
        Ok(GetPromptResponse { prompt, workspace_token })
    }

    pub async fn list_prompt_versions(&self, user_id: &str, prompt_id: i64, limit: i64) -> Result<ListVersionsResponse> {
        self.prompts.find_by_id(user_id, prompt_id).await?;
        let versions = self.prompts.list_versions(prompt_id, limit).await?;
        Ok(ListVersionsResponse { versions })
    }

    pub async fn get_prompt_version_detail(&self, user_id: &str, prompt_id: i64, version_no: i64) -> Result<PromptVersion> {
        self.prompts.find_by_id(user_id, prompt_id).await?;
        self.prompts.find_version(prompt_id, version_no).await
    }

    pub async fn delete_prompt(&self, user_id: &str, prompt_id: i64) -> Result<()> {
        self.prompts.delete_by_id(user_id, prompt_id).await
    }

    pub async fn update_favorite(&self, user_id: &str, prompt_id: i64, favorited: bool) -> Result<()> {
        self.prompts.set_favorite(user_id, prompt_id, favorited).await
    }

    pub async fn like(&self, user_id: &str, prompt_id: i64) -> Result<()> {
        self.prompts.like(user_id, prompt_id).await
    }

    pub async fn unlike(&self, user_id: &str, prompt_id: i64) -> Result<()> {
        self.prompts.unlike(user_id, prompt_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;

    use crate::domain::KeywordItem;
    use crate::moderation::ModerationVerdict;

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

    fn ensure_test_env() {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| {
            std::env::set_var("WORKBENCH_CREDENTIAL_ENCRYPTION_KEY", "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=");
        });
    }

    async fn build_service(moderation: Arc<dyn ModerationGate>) -> PromptWorkbenchService {
        ensure_test_env();
        let pool = SqlitePoolOptions::new().connect(":memory:").await.unwrap();
        sqlx::query(include_str!("../../migrations/0001_initial.sql"))
            .execute(&pool)
            .await
            .unwrap();

        let key = {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD.encode([9u8; 32])
        };
        let credentials = Arc::new(crate::llm::CredentialStore::new(pool.clone(), &key).unwrap());
        let gateway = Arc::new(ModelGateway::new(credentials, 35));

        PromptWorkbenchService::new(
            WorkspaceCache::with_ttl(1800),
            Arc::new(KeywordStore::new(pool.clone())),
            Arc::new(PromptStore::new(pool.clone())),
            gateway,
            moderation,
            Arc::new(FreeTierMeter::new(pool.clone(), 10, 86_400)),
            Arc::new(RateLimiter::new()),
        )
    }

    fn item(word: &str, polarity: Polarity) -> KeywordItem {
        super::super::text::keyword_item(word.to_string(), polarity, None, KeywordSource::Manual)
    }

    // Scenario: content rejection aborts interpret before any model call or write.
    #[tokio::test]
    async fn interpret_rejects_disallowed_description_without_model_call() {
        let service = build_service(Arc::new(AlwaysReject("requests disallowed content"))).await;
        let err = service
            .interpret(InterpretRequest {
                user_id: "u1".to_string(),
                description: "write something harmful".to_string(),
                language: "en".to_string(),
                model_key: None,
            })
            .await
            .unwrap_err();
        match err {
            WorkbenchError::ContentRejected { reason } => {
                assert_eq!(reason, "requests disallowed content");
            }
            other => panic!("expected ContentRejected, got {other:?}"),
        }
    }

    // Scenario: manual keyword duplicate-then-remove-then-succeed.
    #[tokio::test]
    async fn manual_keyword_duplicate_then_remove_then_succeeds() {
        let service = build_service(Arc::new(AlwaysAllow)).await;

        let id = service
            .add_manual_keyword(AddManualKeywordRequest {
                user_id: "u1".to_string(),
                topic: "rust backend".to_string(),
                word: "async".to_string(),
                polarity: Some(Polarity::Positive),
                weight: None,
                language: "en".to_string(),
                workspace_token: None,
                prompt_id: None,
            })
            .await
            .unwrap();
        assert_eq!(id.word, "async");

        // the duplicate guard only applies within a workspace - seed one on the
        // service's own cache with "async" already present.
        let mut snapshot = WorkspaceSnapshot::new_empty("rust backend".to_string(), "en".to_string());
        snapshot.positive = vec![item("async", Polarity::Positive)];
        let token = service.workspace.create_or_replace("u1", snapshot).await;

        let err = service
            .add_manual_keyword(AddManualKeywordRequest {
                user_id: "u1".to_string(),
                topic: "rust backend".to_string(),
                word: "async".to_string(),
                polarity: Some(Polarity::Positive),
                weight: None,
                language: "en".to_string(),
                workspace_token: Some(token.clone()),
                prompt_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkbenchError::DuplicateKeyword));

        service.workspace.remove_keyword("u1", &token, Polarity::Positive, "async").await.unwrap();

        let retry = service
            .add_manual_keyword(AddManualKeywordRequest {
                user_id: "u1".to_string(),
                topic: "rust backend".to_string(),
                word: "async".to_string(),
                polarity: Some(Polarity::Positive),
                weight: None,
                language: "en".to_string(),
                workspace_token: Some(token),
                prompt_id: None,
            })
            .await
            .unwrap();
        assert_eq!(retry.word, "async");
    }

    // Scenario: sync rejects when a side exceeds the configured keyword limit,
    // leaving the workspace untouched.
    #[tokio::test]
    async fn sync_over_limit_rejects_and_workspace_is_unchanged() {
        let service = build_service(Arc::new(AlwaysAllow)).await;
        let mut snapshot = WorkspaceSnapshot::new_empty("topic".to_string(), "en".to_string());
        snapshot.positive = vec![item("existing", Polarity::Positive)];
        let token = service.workspace.create_or_replace("u1", snapshot).await;

        let too_many: Vec<KeywordItem> = (0..CONFIG.keywords.keyword_limit + 1)
            .map(|i| item(&format!("kw{i}"), Polarity::Positive))
            .collect();

        let err = service
            .sync_workspace_keywords(SyncWorkspaceKeywordsRequest {
                user_id: "u1".to_string(),
                workspace_token: token.clone(),
                positive: too_many,
                negative: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkbenchError::KeywordLimitExceeded { .. }));

        let snapshot = service.workspace.snapshot("u1", &token).await.unwrap();
        assert_eq!(snapshot.positive.len(), 1);
        assert_eq!(snapshot.positive[0].word, "existing");
    }

    // Scenario: first publish assigns v1, republish assigns v2/v3, and
    // retention prunes older versions once the configured cap is exceeded.
    #[tokio::test]
    async fn publish_assigns_monotonic_versions_and_prunes_to_retention() {
        let service = build_service(Arc::new(AlwaysAllow)).await;
        let retention = CONFIG.keywords.version_retention as usize;

        let mut prompt_id = None;
        let total_publishes = retention + 2;
        for n in 0..total_publishes {
            let resp = service
                .save(SaveRequest {
                    user_id: "u1".to_string(),
                    prompt_id,
                    workspace_token: None,
                    topic: "interview prep".to_string(),
                    body: format!("draft body v{n}"),
                    instructions: Some("be concise".to_string()),
                    model: "deepseek-chat".to_string(),
                    status: None,
                    tags: vec!["interview".to_string()],
                    positive: vec![item("React", Polarity::Positive)],
                    negative: vec![],
                    publish: true,
                    enforce_publish_validation: false,
                })
                .await
                .unwrap();
            prompt_id = Some(resp.prompt_id);
            assert_eq!(resp.version, (n + 1) as i64);
            assert_eq!(resp.status, PromptStatus::Published);
        }

        let prompt_id = prompt_id.unwrap();
        let versions = service
            .list_prompt_versions("u1", prompt_id, 100)
            .await
            .unwrap()
            .versions;
        assert_eq!(versions.len(), retention);
        let newest = versions.iter().map(|v| v.version_no).max().unwrap();
        assert_eq!(newest, total_publishes as i64);
        let oldest_kept = versions.iter().map(|v| v.version_no).min().unwrap();
        assert_eq!(oldest_kept, (total_publishes - retention + 1) as i64);

        let prompt = service.get_prompt("u1", prompt_id).await.unwrap().prompt;
        assert_eq!(prompt.latest_version_no, total_publishes as i64);
        assert_eq!(prompt.status, PromptStatus::Published);
    }
}
