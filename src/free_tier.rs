// src/free_tier.rs
// Per-user, per-calendar-window quota counter backing the transparent
// fallback model invocation path (§4.6).
//
// Grounded on budget/mod.rs's BudgetTracker: a SQL table keyed by
// (user_id, window_start) with an atomic INSERT ... ON CONFLICT DO UPDATE
// increment, and a window-start computation analogous to get_day_start().

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::Result;

pub struct FreeTierMeter {
    db: SqlitePool,
    quota: i64,
    window_secs: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct QuotaStatus {
    pub allowed: bool,
    pub remaining: i64,
    pub retry_after: i64,
}

impl FreeTierMeter {
    pub fn new(db: SqlitePool, quota: i64, window_secs: i64) -> Self {
        Self {
            db,
            quota,
            window_secs,
        }
    }

    fn window_start(&self) -> i64 {
        let now = Utc::now().timestamp();
        (now / self.window_secs) * self.window_secs
    }

    /// Attempts to consume one unit from the user's current window. The
    /// increment and the quota check happen as a single `INSERT ... ON
    /// CONFLICT ... RETURNING` statement rather than a separate read then
    /// write, so two concurrent callers can never both observe "under quota"
    /// for the same unit (§5: "Free-tier meter increments are atomic").
    /// When `allowed` is false the window's count has still advanced past
    /// quota, but the caller is expected to fail with `FreeTierExceeded`
    /// rather than invoke the upstream model.
    pub async fn try_consume(&self, user_id: &str) -> Result<QuotaStatus> {
        let window_start = self.window_start();

        let row = sqlx::query(
            "INSERT INTO free_tier_usage (user_id, window_start, count) VALUES (?, ?, 1) \
             ON CONFLICT(user_id, window_start) DO UPDATE SET count = count + 1 \
             RETURNING count",
        )
        .bind(user_id)
        .bind(window_start)
        .fetch_one(&self.db)
        .await?;
        let new_count: i64 = row.get("count");

        if new_count > self.quota {
            let retry_after = window_start + self.window_secs - Utc::now().timestamp();
            return Ok(QuotaStatus {
                allowed: false,
                remaining: 0,
                retry_after: retry_after.max(0),
            });
        }

        Ok(QuotaStatus {
            allowed: true,
            remaining: (self.quota - new_count).max(0),
            retry_after: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup(quota: i64, window_secs: i64) -> FreeTierMeter {
        let pool = SqlitePoolOptions::new().connect(":memory:").await.unwrap();
        sqlx::query(
            "CREATE TABLE free_tier_usage (
                user_id TEXT NOT NULL,
                window_start INTEGER NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, window_start)
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        FreeTierMeter::new(pool, quota, window_secs)
    }

    #[tokio::test]
    async fn consumes_up_to_quota_then_exhausts() {
        let meter = setup(2, 86400).await;
        let first = meter.try_consume("u1").await.unwrap();
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);

        let second = meter.try_consume("u1").await.unwrap();
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);

        let third = meter.try_consume("u1").await.unwrap();
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);
        assert!(third.retry_after > 0);
    }

    #[tokio::test]
    async fn separate_users_have_independent_quotas() {
        let meter = setup(1, 86400).await;
        assert!(meter.try_consume("u1").await.unwrap().allowed);
        assert!(meter.try_consume("u2").await.unwrap().allowed);
        assert!(!meter.try_consume("u1").await.unwrap().allowed);
    }
}
