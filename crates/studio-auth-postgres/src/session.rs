//! Browser session storage.
//!
//! Session contents are stored as JSONB next to their expiry.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;
use time::OffsetDateTime;

use studio_auth::AuthResult;
use studio_auth::oauth::SessionData;
use studio_auth::storage::SessionStore;

use crate::{PostgresAuthStorage, StorageError};

#[async_trait]
impl SessionStore for PostgresAuthStorage {
    async fn load(&self, session_id: &str) -> AuthResult<Option<SessionData>> {
        let data: Option<serde_json::Value> = query_scalar(
            "SELECT data FROM studio_sessions WHERE id = $1 AND expires_at > $2",
        )
        .bind(session_id)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(self.pool())
        .await
        .map_err(StorageError::from)?;

        match data {
            Some(value) => {
                let session = serde_json::from_value(value).map_err(StorageError::from)?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        session_id: &str,
        data: &SessionData,
        expires_at: OffsetDateTime,
    ) -> AuthResult<()> {
        let value = serde_json::to_value(data).map_err(StorageError::from)?;

        query(
            r#"
            INSERT INTO studio_sessions (id, data, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET data = EXCLUDED.data,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(session_id)
        .bind(&value)
        .bind(expires_at)
        .execute(self.pool())
        .await
        .map_err(StorageError::from)?;

        Ok(())
    }

    async fn remove(&self, session_id: &str) -> AuthResult<()> {
        query("DELETE FROM studio_sessions WHERE id = $1")
            .bind(session_id)
            .execute(self.pool())
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let result = query("DELETE FROM studio_sessions WHERE expires_at < $1")
            .bind(now)
            .execute(self.pool())
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }
}
