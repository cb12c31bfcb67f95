// src/prompt_store.rs
// Durable prompts, their keyword snapshots, and version history (§4.3).
//
// ReplacePromptKeywords follows cache/session_state_store.rs's
// delete-then-reinsert pattern for child rows. The versioning contract's
// "assign inside the transaction" requirement uses sqlx's transaction API,
// the natural extension of the teacher's plain-pool sqlx::query usage.

use chrono::Utc;
use sqlx::{Row, SqlitePool, Sqlite, Transaction};

use crate::domain::{KeywordItem, Prompt, PromptStatus, PromptVersion, PromptVersionRow};
use crate::errors::{Result, WorkbenchError};

#[derive(Debug, Clone, Default)]
pub struct PromptListFilter {
    pub status: Option<PromptStatus>,
    pub query: Option<String>,
    pub favorited_only: bool,
    pub page: u32,
    pub page_size: u32,
}

pub struct PromptStore {
    db: SqlitePool,
}

fn serialize_keywords(items: &[KeywordItem]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn deserialize_keywords(json: &str) -> Vec<KeywordItem> {
    serde_json::from_str(json).unwrap_or_default()
}

struct PromptRow {
    id: i64,
    user_id: String,
    topic: String,
    body: String,
    instructions: Option<String>,
    positive_keywords_json: String,
    negative_keywords_json: String,
    tags_json: String,
    model: String,
    status: String,
    latest_version_no: i64,
    published_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
    is_favorited: bool,
    like_count: i64,
}

impl PromptRow {
    fn into_prompt(self) -> Result<Prompt> {
        Ok(Prompt {
            id: self.id,
            user_id: self.user_id,
            topic: self.topic,
            body: self.body,
            instructions: self.instructions,
            model: self.model,
            status: self.status.parse()?,
            tags: serde_json::from_str(&self.tags_json).unwrap_or_default(),
            positive: deserialize_keywords(&self.positive_keywords_json),
            negative: deserialize_keywords(&self.negative_keywords_json),
            latest_version_no: self.latest_version_no,
            published_at: self.published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_favorited: self.is_favorited,
            like_count: self.like_count,
        })
    }

    fn from_sqlx_row(row: &sqlx::sqlite::SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            user_id: row.get("user_id"),
            topic: row.get("topic"),
            body: row.get("body"),
            instructions: row.get("instructions"),
            positive_keywords_json: row.get("positive_keywords_json"),
            negative_keywords_json: row.get("negative_keywords_json"),
            tags_json: row.get("tags_json"),
            model: row.get("model"),
            status: row.get("status"),
            latest_version_no: row.get("latest_version_no"),
            published_at: row.get("published_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            is_favorited: row.get("is_favorited"),
            like_count: row.get("like_count"),
        }
    }
}

const PROMPT_COLUMNS: &str = "id, user_id, topic, body, instructions, positive_keywords_json, \
     negative_keywords_json, tags_json, model, status, latest_version_no, published_at, \
     created_at, updated_at, is_favorited, like_count";

impl PromptStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// `Create(prompt)`. Returns the allocated id. Generic over the executor
    /// so callers that need the insert inside a larger transaction (Save,
    /// §4.8.7) can pass `&mut *tx`; other callers pass `&self.db` via
    /// `create`'s pool-bound sibling below.
    pub async fn create_in<'e, E>(&self, exec: E, prompt: &Prompt) -> Result<i64>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query(
            "INSERT INTO prompts (user_id, topic, body, instructions, positive_keywords_json, \
             negative_keywords_json, tags_json, model, status, latest_version_no, published_at, \
             created_at, updated_at, is_favorited, like_count) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id"
        )
        .bind(&prompt.user_id)
        .bind(&prompt.topic)
        .bind(&prompt.body)
        .bind(&prompt.instructions)
        .bind(serialize_keywords(&prompt.positive))
        .bind(serialize_keywords(&prompt.negative))
        .bind(serde_json::to_string(&prompt.tags).unwrap_or_else(|_| "[]".into()))
        .bind(&prompt.model)
        .bind(prompt.status.as_str())
        .bind(prompt.latest_version_no)
        .bind(prompt.published_at)
        .bind(prompt.created_at)
        .bind(prompt.updated_at)
        .bind(prompt.is_favorited)
        .bind(prompt.like_count)
        .fetch_one(exec)
        .await?;
        Ok(row.get::<i64, _>("id"))
    }

    pub async fn create(&self, prompt: &Prompt) -> Result<i64> {
        self.create_in(&self.db, prompt).await
    }

    /// `Update(prompt)`. Generic over the executor for the same reason as
    /// `create_in`.
    pub async fn update_in<'e, E>(&self, exec: E, prompt: &Prompt) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE prompts SET topic = ?, body = ?, instructions = ?, positive_keywords_json = ?, \
             negative_keywords_json = ?, tags_json = ?, model = ?, status = ?, latest_version_no = ?, \
             published_at = ?, updated_at = ?, is_favorited = ?, like_count = ? \
             WHERE id = ? AND user_id = ?",
        )
        .bind(&prompt.topic)
        .bind(&prompt.body)
        .bind(&prompt.instructions)
        .bind(serialize_keywords(&prompt.positive))
        .bind(serialize_keywords(&prompt.negative))
        .bind(serde_json::to_string(&prompt.tags).unwrap_or_else(|_| "[]".into()))
        .bind(&prompt.model)
        .bind(prompt.status.as_str())
        .bind(prompt.latest_version_no)
        .bind(prompt.published_at)
        .bind(now)
        .bind(prompt.is_favorited)
        .bind(prompt.like_count)
        .bind(prompt.id)
        .bind(&prompt.user_id)
        .execute(exec)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WorkbenchError::PromptNotFound);
        }
        Ok(())
    }

    pub async fn update(&self, prompt: &Prompt) -> Result<()> {
        self.update_in(&self.db, prompt).await
    }

    /// `FindById(userId, promptId)`. Generic over the executor so Save can
    /// read-then-write the same row inside its transaction without a second,
    /// independently-committing connection racing it.
    pub async fn find_by_id_in<'e, E>(&self, exec: E, user_id: &str, prompt_id: i64) -> Result<Prompt>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query(&format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts WHERE id = ? AND user_id = ?"
        ))
        .bind(prompt_id)
        .bind(user_id)
        .fetch_optional(exec)
        .await?;
        let row = row.ok_or(WorkbenchError::PromptNotFound)?;
        PromptRow::from_sqlx_row(&row).into_prompt()
    }

    pub async fn find_by_id(&self, user_id: &str, prompt_id: i64) -> Result<Prompt> {
        self.find_by_id_in(&self.db, user_id, prompt_id).await
    }

    /// `FindByUserAndTopic(userId, topic)`. Returns the most recently updated match, if any.
    pub async fn find_by_user_and_topic(
        &self,
        user_id: &str,
        topic: &str,
    ) -> Result<Option<Prompt>> {
        let row = sqlx::query(&format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts WHERE user_id = ? AND topic = ? \
             ORDER BY updated_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(topic)
        .fetch_optional(&self.db)
        .await?;
        row.map(|r| PromptRow::from_sqlx_row(&r).into_prompt())
            .transpose()
    }

    /// `ListByUser(userId, filter) -> (prompts, total)`.
    pub async fn list_by_user(
        &self,
        user_id: &str,
        filter: &PromptListFilter,
    ) -> Result<(Vec<Prompt>, i64)> {
        let mut where_clause = String::from("WHERE user_id = ?");
        if filter.status.is_some() {
            where_clause.push_str(" AND status = ?");
        }
        if filter.query.is_some() {
            where_clause.push_str(" AND (lower(topic) LIKE ? OR lower(tags_json) LIKE ?)");
        }
        if filter.favorited_only {
            where_clause.push_str(" AND is_favorited = 1");
        }

        let count_sql = format!("SELECT COUNT(*) as c FROM prompts {where_clause}");
        let mut count_query = sqlx::query(&count_sql).bind(user_id);
        if let Some(status) = filter.status {
            count_query = count_query.bind(status.as_str());
        }
        if let Some(q) = &filter.query {
            let pattern = format!("%{}%", q.to_lowercase());
            count_query = count_query.bind(pattern.clone()).bind(pattern);
        }
        let total: i64 = count_query.fetch_one(&self.db).await?.get("c");

        let page = filter.page.max(1);
        let page_size = filter.page_size.max(1);
        let offset = (page - 1) as i64 * page_size as i64;

        let list_sql = format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts {where_clause} ORDER BY updated_at DESC LIMIT ? OFFSET ?"
        );
        let mut list_query = sqlx::query(&list_sql).bind(user_id);
        if let Some(status) = filter.status {
            list_query = list_query.bind(status.as_str());
        }
        if let Some(q) = &filter.query {
            let pattern = format!("%{}%", q.to_lowercase());
            list_query = list_query.bind(pattern.clone()).bind(pattern);
        }
        let rows = list_query
            .bind(page_size as i64)
            .bind(offset)
            .fetch_all(&self.db)
            .await?;

        let prompts = rows
            .iter()
            .map(|r| PromptRow::from_sqlx_row(r).into_prompt())
            .collect::<Result<Vec<_>>>()?;

        Ok((prompts, total))
    }

    /// `DeleteById(userId, promptId)`. Cascades to versions and keyword relations.
    pub async fn delete_by_id(&self, user_id: &str, prompt_id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM prompts WHERE id = ? AND user_id = ?")
            .bind(prompt_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(WorkbenchError::PromptNotFound);
        }
        Ok(())
    }

    /// `ReplacePromptKeywords(promptId, positiveIds, negativeIds)`. Atomic
    /// delete-then-reinsert, same shape as session_state_store's child rows.
    pub async fn replace_prompt_keywords(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        prompt_id: i64,
        positive_ids: &[i64],
        negative_ids: &[i64],
    ) -> Result<()> {
        sqlx::query("DELETE FROM prompt_keywords WHERE prompt_id = ?")
            .bind(prompt_id)
            .execute(&mut **tx)
            .await?;

        for keyword_id in positive_ids {
            sqlx::query(
                "INSERT INTO prompt_keywords (prompt_id, keyword_id, relation) VALUES (?, ?, 'positive')",
            )
            .bind(prompt_id)
            .bind(keyword_id)
            .execute(&mut **tx)
            .await?;
        }
        for keyword_id in negative_ids {
            sqlx::query(
                "INSERT INTO prompt_keywords (prompt_id, keyword_id, relation) VALUES (?, ?, 'negative')",
            )
            .bind(prompt_id)
            .bind(keyword_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Sqlite>> {
        Ok(self.db.begin().await?)
    }

    /// `CreateVersion(version)`.
    pub async fn create_version(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        version: &PromptVersion,
    ) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO prompt_versions (prompt_id, version_no, body, instructions, \
             positive_keywords_json, negative_keywords_json, model, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(version.prompt_id)
        .bind(version.version_no)
        .bind(&version.body)
        .bind(&version.instructions)
        .bind(serialize_keywords(&version.positive))
        .bind(serialize_keywords(&version.negative))
        .bind(&version.model)
        .bind(version.created_at)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row.get::<i64, _>("id"))
    }

    /// `ListVersions(promptId, limit) -> [PromptVersion]`, newest first.
    pub async fn list_versions(&self, prompt_id: i64, limit: i64) -> Result<Vec<PromptVersion>> {
        let rows = sqlx::query_as::<_, PromptVersionRow>(
            "SELECT id, prompt_id, version_no, body, instructions, positive_keywords_json, \
             negative_keywords_json, model, created_at FROM prompt_versions \
             WHERE prompt_id = ? ORDER BY version_no DESC LIMIT ?",
        )
        .bind(prompt_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(row_to_version).collect())
    }

    /// `FindVersion(promptId, versionNo)`.
    pub async fn find_version(&self, prompt_id: i64, version_no: i64) -> Result<PromptVersion> {
        let row = sqlx::query_as::<_, PromptVersionRow>(
            "SELECT id, prompt_id, version_no, body, instructions, positive_keywords_json, \
             negative_keywords_json, model, created_at FROM prompt_versions \
             WHERE prompt_id = ? AND version_no = ?",
        )
        .bind(prompt_id)
        .bind(version_no)
        .fetch_optional(&self.db)
        .await?;
        row.map(row_to_version)
            .ok_or(WorkbenchError::PromptVersionNotFound)
    }

    /// `PruneVersions(promptId, keep)`. Oldest-by-versionNo removed past `keep`.
    pub async fn prune_versions(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        prompt_id: i64,
        keep: u32,
    ) -> Result<()> {
        sqlx::query(
            "DELETE FROM prompt_versions WHERE prompt_id = ? AND version_no NOT IN \
             (SELECT version_no FROM prompt_versions WHERE prompt_id = ? \
              ORDER BY version_no DESC LIMIT ?)",
        )
        .bind(prompt_id)
        .bind(prompt_id)
        .bind(keep as i64)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Highest existing versionNo for a prompt, or 0 if none. Used to compute
    /// `newVersionNo = max(existing versionNos, latestVersionNo) + 1`.
    pub async fn max_version_no(&self, tx: &mut Transaction<'_, Sqlite>, prompt_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COALESCE(MAX(version_no), 0) as m FROM prompt_versions WHERE prompt_id = ?")
            .bind(prompt_id)
            .fetch_one(&mut **tx)
            .await?;
        Ok(row.get::<i64, _>("m"))
    }

    pub async fn set_favorite(&self, user_id: &str, prompt_id: i64, favorited: bool) -> Result<()> {
        let result = sqlx::query("UPDATE prompts SET is_favorited = ? WHERE id = ? AND user_id = ?")
            .bind(favorited)
            .bind(prompt_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(WorkbenchError::PromptNotFound);
        }
        Ok(())
    }

    pub async fn like(&self, user_id: &str, prompt_id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE prompts SET like_count = like_count + 1 WHERE id = ? AND user_id = ?",
        )
        .bind(prompt_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(WorkbenchError::PromptNotFound);
        }
        Ok(())
    }

    pub async fn unlike(&self, user_id: &str, prompt_id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE prompts SET like_count = MAX(like_count - 1, 0) WHERE id = ? AND user_id = ?",
        )
        .bind(prompt_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(WorkbenchError::PromptNotFound);
        }
        Ok(())
    }
}

fn row_to_version(row: PromptVersionRow) -> PromptVersion {
    PromptVersion {
        id: row.id,
        prompt_id: row.prompt_id,
        version_no: row.version_no,
        body: row.body,
        instructions: row.instructions,
        positive: deserialize_keywords(&row.positive_keywords_json),
        negative: deserialize_keywords(&row.negative_keywords_json),
        model: row.model,
        created_at: row.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{KeywordSource, Polarity};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect(":memory:")
            .await
            .expect("in-memory sqlite");
        sqlx::query(include_str!("../migrations/0001_initial.sql"))
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    fn sample_prompt(user_id: &str) -> Prompt {
        let now = 1_700_000_000;
        Prompt {
            id: 0,
            user_id: user_id.to_string(),
            topic: "React frontend interview".to_string(),
            body: String::new(),
            instructions: None,
            model: "deepseek-chat".to_string(),
            status: PromptStatus::Draft,
            tags: vec!["React".to_string()],
            positive: vec![KeywordItem {
                word: "React".to_string(),
                polarity: Polarity::Positive,
                weight: 5,
                source: KeywordSource::Model,
                keyword_id: None,
            }],
            negative: vec![],
            latest_version_no: 0,
            published_at: None,
            created_at: now,
            updated_at: now,
            is_favorited: false,
            like_count: 0,
        }
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let store = PromptStore::new(setup().await);
        let mut prompt = sample_prompt("u1");
        let id = store.create(&prompt).await.unwrap();
        prompt.id = id;
        let found = store.find_by_id("u1", id).await.unwrap();
        assert_eq!(found.topic, "React frontend interview");
        assert_eq!(found.positive.len(), 1);
    }

    #[tokio::test]
    async fn find_by_id_wrong_owner_not_found() {
        let store = PromptStore::new(setup().await);
        let id = store.create(&sample_prompt("u1")).await.unwrap();
        let err = store.find_by_id("u2", id).await.unwrap_err();
        assert!(matches!(err, WorkbenchError::PromptNotFound));
    }

    #[tokio::test]
    async fn versioning_assigns_monotonic_numbers_and_prunes() {
        let store = PromptStore::new(setup().await);
        let id = store.create(&sample_prompt("u1")).await.unwrap();

        for body in ["v1", "v2", "v3"] {
            let mut tx = store.begin().await.unwrap();
            let max = store.max_version_no(&mut tx, id).await.unwrap();
            let version_no = max + 1;
            store
                .create_version(
                    &mut tx,
                    &PromptVersion {
                        id: 0,
                        prompt_id: id,
                        version_no,
                        body: body.to_string(),
                        instructions: None,
                        positive: vec![],
                        negative: vec![],
                        model: "deepseek-chat".to_string(),
                        created_at: 1_700_000_000 + version_no,
                    },
                )
                .await
                .unwrap();
            store.prune_versions(&mut tx, id, 2).await.unwrap();
            tx.commit().await.unwrap();
        }

        let versions = store.list_versions(id, 10).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version_no, 3);
        assert_eq!(versions[1].version_no, 2);
    }

    #[tokio::test]
    async fn replace_prompt_keywords_is_delete_then_reinsert() {
        let store = PromptStore::new(setup().await);
        let id = store.create(&sample_prompt("u1")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        sqlx::query(
            "INSERT INTO keywords (user_id, topic, word, polarity, source, weight, language, created_at, updated_at) \
             VALUES ('u1','t','a','positive','model',5,'en',0,0), ('u1','t','b','negative','model',5,'en',0,0)",
        )
        .execute(&mut *tx)
        .await
        .unwrap();
        store.replace_prompt_keywords(&mut tx, id, &[1], &[2]).await.unwrap();
        tx.commit().await.unwrap();

        let rows = sqlx::query("SELECT relation FROM prompt_keywords WHERE prompt_id = ?")
            .bind(id)
            .fetch_all(&store.db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }
}
