// src/workspace.rs
// In-memory, TTL'd, atomically-mutated per-(userId, token) scratchpad.
//
// Grounded on the teacher's dominant in-process shared-state idiom:
// Arc<RwLock<HashMap<K, V>>> (the teacher never reaches for moka/dashmap).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::RngCore;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::CONFIG;
use crate::domain::{KeywordItem, Polarity, PromptStatus, WorkspaceSnapshot};
use crate::errors::{Result, WorkbenchError};

type UserId = String;
type Token = String;

struct Entry {
    user_id: UserId,
    snapshot: WorkspaceSnapshot,
    expires_at: i64,
}

/// Holds the ordered-sequence and keyed-detail views together under one lock
/// so merges/replaces (§4.1 "atomicity") cannot be observed half-applied —
/// both views live inside `WorkspaceSnapshot.positive`/`negative`, a single
/// `Vec<KeywordItem>` per polarity, which already gives O(1)-amortized
/// append and linear scan for the (small, bounded-by-KeywordLimit) lookup.
pub struct WorkspaceCache {
    entries: Arc<RwLock<HashMap<Token, Entry>>>,
    ttl_secs: i64,
}

impl WorkspaceCache {
    pub fn new() -> Arc<Self> {
        Self::with_ttl(CONFIG.keywords.workspace_ttl_secs)
    }

    /// Constructs a cache with an explicit TTL, bypassing the global
    /// `CONFIG` singleton. Production wiring goes through `new()`; tests use
    /// this directly so they never force `CONFIG::from_env()` to resolve
    /// (which panics without `WORKBENCH_CREDENTIAL_ENCRYPTION_KEY` set).
    pub fn with_ttl(ttl_secs: i64) -> Arc<Self> {
        let cache = Arc::new(Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl_secs,
        });
        cache.clone().spawn_sweeper();
        cache
    }

    fn spawn_sweeper(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let now = Utc::now().timestamp();
                let mut entries = self.entries.write().await;
                let before = entries.len();
                entries.retain(|_, e| e.expires_at > now);
                let removed = before - entries.len();
                if removed > 0 {
                    debug!("workspace sweep reclaimed {} expired entries", removed);
                }
            }
        });
    }

    fn generate_token() -> String {
        // Unguessable per SPEC_FULL.md §9: uuid v4 plus extra entropy bytes,
        // hex-encoded, so leaking a token never lets an attacker predict another.
        let mut extra = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut extra);
        format!("{}{}", uuid::Uuid::new_v4().simple(), hex_encode(&extra))
    }

    /// `CreateOrReplace(userId, snapshot) -> token`.
    pub async fn create_or_replace(&self, user_id: &str, snapshot: WorkspaceSnapshot) -> String {
        let token = Self::generate_token();
        let expires_at = Utc::now().timestamp() + self.ttl_secs;
        self.entries.write().await.insert(
            token.clone(),
            Entry {
                user_id: user_id.to_string(),
                snapshot,
                expires_at,
            },
        );
        token
    }

    fn check_owner(entry: &Entry, user_id: &str, now: i64) -> Result<()> {
        if entry.user_id != user_id || entry.expires_at <= now {
            return Err(WorkbenchError::WorkspaceNotFound);
        }
        Ok(())
    }

    /// `Snapshot(userId, token) -> WorkspaceSnapshot`.
    pub async fn snapshot(&self, user_id: &str, token: &str) -> Result<WorkspaceSnapshot> {
        let mut entries = self.entries.write().await;
        let now = Utc::now().timestamp();
        let entry = entries.get_mut(token).ok_or(WorkbenchError::WorkspaceNotFound)?;
        Self::check_owner(entry, user_id, now)?;
        entry.expires_at = now + self.ttl_secs;
        Ok(entry.snapshot.clone())
    }

    /// `Touch(userId, token)`.
    pub async fn touch(&self, user_id: &str, token: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        let now = Utc::now().timestamp();
        let entry = entries.get_mut(token).ok_or(WorkbenchError::WorkspaceNotFound)?;
        Self::check_owner(entry, user_id, now)?;
        entry.expires_at = now + self.ttl_secs;
        Ok(())
    }

    /// `Delete(userId, token)`.
    pub async fn delete(&self, user_id: &str, token: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(token) {
            if entry.user_id != user_id {
                return Err(WorkbenchError::WorkspaceNotFound);
            }
        }
        entries.remove(token);
        Ok(())
    }

    /// `MergeKeywords(userId, token, newItems)`: keyed by (polarity, lower(word)).
    /// Present -> update weight/source/word; absent -> append in input order.
    pub async fn merge_keywords(
        &self,
        user_id: &str,
        token: &str,
        new_items: Vec<KeywordItem>,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        let now = Utc::now().timestamp();
        let entry = entries.get_mut(token).ok_or(WorkbenchError::WorkspaceNotFound)?;
        Self::check_owner(entry, user_id, now)?;

        for item in new_items {
            let bucket = entry.snapshot.keywords_mut(item.polarity);
            let lower = item.lower_word();
            if let Some(existing) = bucket.iter_mut().find(|k| k.lower_word() == lower) {
                existing.word = item.word;
                existing.weight = item.weight;
                existing.source = item.source;
                if item.keyword_id.is_some() {
                    existing.keyword_id = item.keyword_id;
                }
            } else {
                bucket.push(item);
            }
        }
        entry.expires_at = now + self.ttl_secs;
        Ok(())
    }

    /// `RemoveKeyword(userId, token, polarity, word)`: case-insensitive, no-op if absent.
    pub async fn remove_keyword(
        &self,
        user_id: &str,
        token: &str,
        polarity: Polarity,
        word: &str,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        let now = Utc::now().timestamp();
        let entry = entries.get_mut(token).ok_or(WorkbenchError::WorkspaceNotFound)?;
        Self::check_owner(entry, user_id, now)?;
        let lower = word.to_lowercase();
        entry
            .snapshot
            .keywords_mut(polarity)
            .retain(|k| k.lower_word() != lower);
        entry.expires_at = now + self.ttl_secs;
        Ok(())
    }

    /// `ReplaceKeywords(userId, token, polarity, orderedItems)`: atomic full replace.
    pub async fn replace_keywords(
        &self,
        user_id: &str,
        token: &str,
        polarity: Polarity,
        ordered_items: Vec<KeywordItem>,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        let now = Utc::now().timestamp();
        let entry = entries.get_mut(token).ok_or(WorkbenchError::WorkspaceNotFound)?;
        Self::check_owner(entry, user_id, now)?;
        *entry.snapshot.keywords_mut(polarity) = ordered_items;
        entry.expires_at = now + self.ttl_secs;
        Ok(())
    }

    /// `UpdateDraftBody(userId, token, body)`.
    pub async fn update_draft_body(&self, user_id: &str, token: &str, body: String) -> Result<()> {
        let mut entries = self.entries.write().await;
        let now = Utc::now().timestamp();
        let entry = entries.get_mut(token).ok_or(WorkbenchError::WorkspaceNotFound)?;
        Self::check_owner(entry, user_id, now)?;
        entry.snapshot.draft_body = body;
        entry.expires_at = now + self.ttl_secs;
        Ok(())
    }

    /// `SetPromptMeta(userId, token, promptId, status)`.
    pub async fn set_prompt_meta(
        &self,
        user_id: &str,
        token: &str,
        prompt_id: i64,
        status: PromptStatus,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        let now = Utc::now().timestamp();
        let entry = entries.get_mut(token).ok_or(WorkbenchError::WorkspaceNotFound)?;
        Self::check_owner(entry, user_id, now)?;
        entry.snapshot.prompt_id = Some(prompt_id);
        entry.snapshot.status = Some(status);
        entry.expires_at = now + self.ttl_secs;
        Ok(())
    }

    /// `SetAttributes(userId, token, attrs)`: bulk write of named scalars.
    pub async fn set_attributes(
        &self,
        user_id: &str,
        token: &str,
        topic: Option<String>,
        language: Option<String>,
        model_key: Option<String>,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        let now = Utc::now().timestamp();
        let entry = entries.get_mut(token).ok_or(WorkbenchError::WorkspaceNotFound)?;
        Self::check_owner(entry, user_id, now)?;
        if let Some(topic) = topic {
            entry.snapshot.topic = topic;
        }
        if let Some(language) = language {
            entry.snapshot.language = language;
        }
        if let Some(model_key) = model_key {
            entry.snapshot.model_key = Some(model_key);
        }
        entry.expires_at = now + self.ttl_secs;
        Ok(())
    }

}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::KeywordSource;

    fn item(word: &str, polarity: Polarity, weight: i64) -> KeywordItem {
        KeywordItem {
            word: word.to_string(),
            polarity,
            weight,
            source: KeywordSource::Model,
            keyword_id: None,
        }
    }

    #[tokio::test]
    async fn create_and_snapshot_round_trips() {
        let cache = WorkspaceCache::with_ttl(1800);
        let snap = WorkspaceSnapshot::new_empty("topic", "en");
        let token = cache.create_or_replace("u1", snap).await;
        let got = cache.snapshot("u1", &token).await.unwrap();
        assert_eq!(got.topic, "topic");
    }

    #[tokio::test]
    async fn snapshot_wrong_owner_is_not_found() {
        let cache = WorkspaceCache::with_ttl(1800);
        let token = cache
            .create_or_replace("u1", WorkspaceSnapshot::new_empty("t", "en"))
            .await;
        let err = cache.snapshot("u2", &token).await.unwrap_err();
        assert!(matches!(err, WorkbenchError::WorkspaceNotFound));
    }

    #[tokio::test]
    async fn merge_keywords_appends_then_updates_in_place() {
        let cache = WorkspaceCache::with_ttl(1800);
        let token = cache
            .create_or_replace("u1", WorkspaceSnapshot::new_empty("t", "en"))
            .await;
        cache
            .merge_keywords("u1", &token, vec![item("React", Polarity::Positive, 5)])
            .await
            .unwrap();
        cache
            .merge_keywords(
                "u1",
                &token,
                vec![
                    item("react", Polarity::Positive, 3),
                    item("Hooks", Polarity::Positive, 4),
                ],
            )
            .await
            .unwrap();
        let snap = cache.snapshot("u1", &token).await.unwrap();
        assert_eq!(snap.positive.len(), 2);
        assert_eq!(snap.positive[0].word, "react");
        assert_eq!(snap.positive[0].weight, 3);
        assert_eq!(snap.positive[1].word, "Hooks");
    }

    #[tokio::test]
    async fn remove_keyword_is_noop_when_absent() {
        let cache = WorkspaceCache::with_ttl(1800);
        let token = cache
            .create_or_replace("u1", WorkspaceSnapshot::new_empty("t", "en"))
            .await;
        cache
            .remove_keyword("u1", &token, Polarity::Positive, "nope")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn replace_keywords_is_atomic_full_swap() {
        let cache = WorkspaceCache::with_ttl(1800);
        let token = cache
            .create_or_replace("u1", WorkspaceSnapshot::new_empty("t", "en"))
            .await;
        cache
            .merge_keywords("u1", &token, vec![item("old", Polarity::Positive, 5)])
            .await
            .unwrap();
        cache
            .replace_keywords(
                "u1",
                &token,
                Polarity::Positive,
                vec![item("new1", Polarity::Positive, 1), item("new2", Polarity::Positive, 2)],
            )
            .await
            .unwrap();
        let snap = cache.snapshot("u1", &token).await.unwrap();
        assert_eq!(snap.positive.len(), 2);
        assert_eq!(snap.positive[0].word, "new1");
    }

    #[tokio::test]
    async fn expired_entry_is_treated_as_not_found() {
        let cache = WorkspaceCache::with_ttl(1800);
        let token = cache
            .create_or_replace("u1", WorkspaceSnapshot::new_empty("t", "en"))
            .await;
        {
            let mut entries = cache.entries.write().await;
            entries.get_mut(&token).unwrap().expires_at = Utc::now().timestamp() - 1;
        }
        let err = cache.snapshot("u1", &token).await.unwrap_err();
        assert!(matches!(err, WorkbenchError::WorkspaceNotFound));
    }
}
