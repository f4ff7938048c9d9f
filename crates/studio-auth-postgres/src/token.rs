//! Refresh token storage.
//!
//! Tokens are looked up by their SHA-256 digest. Revocation sets
//! `revoked_at`; rows are never deleted here.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use studio_auth::AuthResult;
use studio_auth::storage::RefreshTokenStorage;
use studio_auth::types::RefreshToken;

use crate::{PostgresAuthStorage, StorageError};

type TokenTuple = (
    Uuid,
    String,
    String,
    Uuid,
    String,
    OffsetDateTime,
    Option<OffsetDateTime>,
);

fn token_from_tuple(row: TokenTuple) -> RefreshToken {
    RefreshToken {
        id: row.0,
        token_hash: row.1,
        client_id: row.2,
        user_id: row.3,
        scope: row.4,
        expires_at: row.5,
        revoked_at: row.6,
    }
}

#[async_trait]
impl RefreshTokenStorage for PostgresAuthStorage {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO studio_refresh_tokens
                (id, token_hash, client_id, user_id, scope, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.id)
        .bind(&token.token_hash)
        .bind(&token.client_id)
        .bind(token.user_id)
        .bind(&token.scope)
        .bind(token.expires_at)
        .bind(token.revoked_at)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::from_insert(e, || "Refresh token collision".to_string()))?;

        Ok(())
    }

    async fn find_active(
        &self,
        token_hash: &str,
        client_id: &str,
    ) -> AuthResult<Option<RefreshToken>> {
        let row: Option<TokenTuple> = query_as(
            r#"
            SELECT id, token_hash, client_id, user_id, scope, expires_at, revoked_at
            FROM studio_refresh_tokens
            WHERE token_hash = $1
              AND client_id = $2
              AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .bind(client_id)
        .fetch_optional(self.pool())
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(token_from_tuple))
    }

    async fn revoke(&self, token_hash: &str) -> AuthResult<bool> {
        let result = query(
            r#"
            UPDATE studio_refresh_tokens
            SET revoked_at = $2
            WHERE token_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .map_err(StorageError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all(&self, user_id: Uuid, client_id: Option<&str>) -> AuthResult<u64> {
        let result = query(
            r#"
            UPDATE studio_refresh_tokens
            SET revoked_at = $3
            WHERE user_id = $1
              AND ($2::text IS NULL OR client_id = $2)
              AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(client_id)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }

    async fn revoke_by_client(&self, client_id: &str) -> AuthResult<u64> {
        let result = query(
            r#"
            UPDATE studio_refresh_tokens
            SET revoked_at = $2
            WHERE client_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(client_id)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }
}
