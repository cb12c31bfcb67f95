// src/keyword_store.rs
// Persistent, user-scoped keyword catalog (§4.2).
//
// Grounded on auth/service.rs's CRUD-over-sqlx style: runtime-checked
// sqlx::query/query_as, not the compile-time query!/query_as! macros (no
// DATABASE_URL is available at build time for this crate).

use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::Keyword;
use crate::errors::Result;

pub struct KeywordStore {
    db: SqlitePool,
}

impl KeywordStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// `Upsert(userId, topic, word, polarity, weight, source, language) -> keywordId`.
    /// Unique key (user_id, topic, lower(word)); weight clamped to 0..=5.
    /// Generic over the executor so Save (§4.8.7) can run the insert-or-update
    /// and the id lookup on the same connection as the rest of its
    /// transaction, rather than racing an independently-committing pool call
    /// against the prompt-row writes it's paired with.
    pub async fn upsert_in<'e, E>(
        &self,
        exec: E,
        user_id: &str,
        topic: &str,
        word: &str,
        polarity: &str,
        weight: i64,
        source: &str,
        language: &str,
    ) -> Result<i64>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let weight = weight.clamp(0, 5);
        let now = Utc::now().timestamp();

        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO keywords (user_id, topic, word, polarity, source, weight, language, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, topic, lower_word) DO UPDATE SET
                word = excluded.word,
                polarity = excluded.polarity,
                source = excluded.source,
                weight = excluded.weight,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(topic)
        .bind(word)
        .bind(polarity)
        .bind(source)
        .bind(weight)
        .bind(language)
        .bind(now)
        .bind(now)
        .fetch_one(exec)
        .await?;

        Ok(row.0)
    }

    pub async fn upsert(
        &self,
        user_id: &str,
        topic: &str,
        word: &str,
        polarity: &str,
        weight: i64,
        source: &str,
        language: &str,
    ) -> Result<i64> {
        self.upsert_in(&self.db, user_id, topic, word, polarity, weight, source, language)
            .await
    }

    /// `ListByTopic(userId, topic) -> [Keyword]`.
    pub async fn list_by_topic(&self, user_id: &str, topic: &str) -> Result<Vec<Keyword>> {
        let rows = sqlx::query_as::<_, Keyword>(
            "SELECT id, user_id, topic, word, polarity, source, weight, language, created_at, updated_at
             FROM keywords WHERE user_id = ? AND topic = ? ORDER BY id",
        )
        .bind(user_id)
        .bind(topic)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    /// `Delete(userId, keywordId)`.
    pub async fn delete(&self, user_id: &str, keyword_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM keywords WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(keyword_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect(":memory:")
            .await
            .expect("in-memory sqlite");
        sqlx::query(
            r#"
            CREATE TABLE keywords (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                topic TEXT NOT NULL,
                word TEXT NOT NULL,
                polarity TEXT NOT NULL,
                source TEXT NOT NULL,
                weight INTEGER NOT NULL,
                language TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                lower_word TEXT GENERATED ALWAYS AS (lower(word)) STORED,
                UNIQUE(user_id, topic, lower_word)
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_unique_key() {
        let store = KeywordStore::new(setup().await);
        let id1 = store
            .upsert("u1", "topic", "React", "positive", 5, "model", "en")
            .await
            .unwrap();
        let id2 = store
            .upsert("u1", "topic", "react", "positive", 3, "manual", "en")
            .await
            .unwrap();
        assert_eq!(id1, id2);
        let rows = store.list_by_topic("u1", "topic").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].weight, 3);
        assert_eq!(rows[0].source, "manual");
    }

    #[tokio::test]
    async fn weight_is_clamped_to_0_5() {
        let store = KeywordStore::new(setup().await);
        let id = store
            .upsert("u1", "topic", "Overweight", "positive", 99, "model", "en")
            .await
            .unwrap();
        let rows = store.list_by_topic("u1", "topic").await.unwrap();
        assert_eq!(rows.iter().find(|r| r.id == id).unwrap().weight, 5);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let store = KeywordStore::new(setup().await);
        let id = store
            .upsert("u1", "topic", "word", "positive", 5, "model", "en")
            .await
            .unwrap();
        store.delete("u1", id).await.unwrap();
        assert!(store.list_by_topic("u1", "topic").await.unwrap().is_empty());
    }
}
