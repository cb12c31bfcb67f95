// src/llm/credential_store.rs
// Durable per-user model credentials, encrypted at rest (§3 ModelCredential).
//
// Crate choice grounded on other_examples/eurora-labs-eurora's manifest (the
// teacher carries no third-party-credential-encryption crate of its own).
// CRUD shape follows keyword_store.rs's sqlx conventions.

use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{AeadCore, ChaCha20Poly1305, Key, Nonce};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::ModelCredentialRow;
use crate::errors::{Result, WorkbenchError};

pub struct CredentialStore {
    db: SqlitePool,
    cipher: ChaCha20Poly1305,
}

impl CredentialStore {
    /// `key_b64` is a base64-encoded 32-byte key, from
    /// `WORKBENCH_CREDENTIAL_ENCRYPTION_KEY` (required, no default).
    pub fn new(db: SqlitePool, key_b64: &str) -> Result<Self> {
        use base64::Engine;
        let key_bytes = base64::engine::general_purpose::STANDARD
            .decode(key_b64)
            .map_err(|e| WorkbenchError::internal(anyhow::anyhow!("invalid credential key: {e}")))?;
        if key_bytes.len() != 32 {
            return Err(WorkbenchError::internal(anyhow::anyhow!(
                "credential encryption key must decode to 32 bytes, got {}",
                key_bytes.len()
            )));
        }
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key_bytes));
        Ok(Self { db, cipher })
    }

    fn encrypt(&self, plaintext: &str) -> Result<(Vec<u8>, Vec<u8>)> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| WorkbenchError::internal(anyhow::anyhow!("credential encryption failed: {e}")))?;
        Ok((ciphertext, nonce.to_vec()))
    }

    fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<String> {
        let nonce = Nonce::from_slice(nonce);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| WorkbenchError::internal(anyhow::anyhow!("credential decryption failed: {e}")))?;
        String::from_utf8(plaintext)
            .map_err(|e| WorkbenchError::internal(anyhow::anyhow!("decrypted credential is not utf-8: {e}")))
    }

    /// `Upsert(userId, modelKey, provider, apiKey, baseUrl)`.
    pub async fn upsert(
        &self,
        user_id: &str,
        model_key: &str,
        provider: &str,
        api_key: &str,
        base_url: Option<&str>,
    ) -> Result<()> {
        let (encrypted_api_key, nonce) = self.encrypt(api_key)?;
        let now = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO model_credentials (user_id, model_key, provider, encrypted_api_key, nonce, \
             base_url, enabled, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?) \
             ON CONFLICT(user_id, model_key) DO UPDATE SET \
                provider = excluded.provider, encrypted_api_key = excluded.encrypted_api_key, \
                nonce = excluded.nonce, base_url = excluded.base_url, updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(model_key)
        .bind(provider)
        .bind(&encrypted_api_key)
        .bind(&nonce)
        .bind(base_url)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn set_enabled(&self, user_id: &str, model_key: &str, enabled: bool) -> Result<()> {
        let result = sqlx::query(
            "UPDATE model_credentials SET enabled = ?, updated_at = ? WHERE user_id = ? AND model_key = ?",
        )
        .bind(enabled)
        .bind(Utc::now().timestamp())
        .bind(user_id)
        .bind(model_key)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(WorkbenchError::CredentialNotFound {
                model_key: model_key.to_string(),
            });
        }
        Ok(())
    }

    /// Resolves and decrypts the credential for `(userId, modelKey)`. Fails
    /// with `CredentialNotFound`/`CredentialDisabled` per §4.4.
    pub async fn resolve(&self, user_id: &str, model_key: &str) -> Result<ResolvedCredential> {
        let row = sqlx::query_as::<_, ModelCredentialRow>(
            "SELECT id, user_id, model_key, provider, encrypted_api_key, nonce, base_url, enabled, \
             created_at, updated_at FROM model_credentials WHERE user_id = ? AND model_key = ?",
        )
        .bind(user_id)
        .bind(model_key)
        .fetch_optional(&self.db)
        .await?;

        let row = row.ok_or_else(|| WorkbenchError::CredentialNotFound {
            model_key: model_key.to_string(),
        })?;

        if !row.enabled {
            return Err(WorkbenchError::CredentialDisabled {
                model_key: model_key.to_string(),
            });
        }

        let api_key = self.decrypt(&row.encrypted_api_key, &row.nonce)?;

        Ok(ResolvedCredential {
            provider: row.provider,
            api_key,
            base_url: row.base_url,
        })
    }
}

pub struct ResolvedCredential {
    pub provider: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> CredentialStore {
        let pool = SqlitePoolOptions::new().connect(":memory:").await.unwrap();
        sqlx::query(
            "CREATE TABLE model_credentials (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                model_key TEXT NOT NULL,
                provider TEXT NOT NULL,
                encrypted_api_key BLOB NOT NULL,
                nonce BLOB NOT NULL,
                base_url TEXT,
                enabled INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(user_id, model_key)
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        use base64::Engine;
        let key = base64::engine::general_purpose::STANDARD.encode([7u8; 32]);
        CredentialStore::new(pool, &key).unwrap()
    }

    #[tokio::test]
    async fn upsert_then_resolve_round_trips_api_key() {
        let store = setup().await;
        store
            .upsert("u1", "gpt-4o", "openai", "sk-secret-value", None)
            .await
            .unwrap();
        let resolved = store.resolve("u1", "gpt-4o").await.unwrap();
        assert_eq!(resolved.api_key, "sk-secret-value");
        assert_eq!(resolved.provider, "openai");
    }

    #[tokio::test]
    async fn missing_credential_is_not_found() {
        let store = setup().await;
        let err = store.resolve("u1", "missing").await.unwrap_err();
        assert!(matches!(err, WorkbenchError::CredentialNotFound { .. }));
    }

    #[tokio::test]
    async fn disabled_credential_errors() {
        let store = setup().await;
        store
            .upsert("u1", "gpt-4o", "openai", "sk-secret-value", None)
            .await
            .unwrap();
        store.set_enabled("u1", "gpt-4o", false).await.unwrap();
        let err = store.resolve("u1", "gpt-4o").await.unwrap_err();
        assert!(matches!(err, WorkbenchError::CredentialDisabled { .. }));
    }
}
