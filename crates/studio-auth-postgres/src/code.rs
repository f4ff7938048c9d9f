//! Authorization code storage.
//!
//! Redemption is a single `DELETE ... RETURNING`, so of two concurrent
//! redemptions of the same code exactly one gets the row.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use studio_auth::AuthResult;
use studio_auth::oauth::PkceChallengeMethod;
use studio_auth::storage::AuthorizationCodeStorage;
use studio_auth::types::AuthorizationCode;

use crate::{PostgresAuthStorage, StorageError, StorageResult};

type CodeTuple = (
    String,
    String,
    Uuid,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    OffsetDateTime,
);

fn code_from_tuple(row: CodeTuple) -> StorageResult<AuthorizationCode> {
    let code_challenge_method = row
        .6
        .as_deref()
        .map(PkceChallengeMethod::parse)
        .transpose()
        .map_err(|e| StorageError::invalid_input(e.to_string()))?;

    Ok(AuthorizationCode {
        code: row.0,
        client_id: row.1,
        user_id: row.2,
        redirect_uri: row.3,
        scope: row.4,
        code_challenge: row.5,
        code_challenge_method,
        nonce: row.7,
        expires_at: row.8,
    })
}

#[async_trait]
impl AuthorizationCodeStorage for PostgresAuthStorage {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO studio_authorization_codes
                (code, client_id, user_id, redirect_uri, scope,
                 code_challenge, code_challenge_method, nonce, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&code.code)
        .bind(&code.client_id)
        .bind(code.user_id)
        .bind(&code.redirect_uri)
        .bind(&code.scope)
        .bind(&code.code_challenge)
        .bind(code.code_challenge_method.map(|m| m.as_str()))
        .bind(&code.nonce)
        .bind(code.expires_at)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::from_insert(e, || "Authorization code collision".to_string()))?;

        Ok(())
    }

    async fn take(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        let row: Option<CodeTuple> = query_as(
            r#"
            DELETE FROM studio_authorization_codes
            WHERE code = $1
            RETURNING code, client_id, user_id, redirect_uri, scope,
                      code_challenge, code_challenge_method, nonce, expires_at
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool())
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(code_from_tuple).transpose()?)
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let result = query("DELETE FROM studio_authorization_codes WHERE expires_at < $1")
            .bind(now)
            .execute(self.pool())
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }

    async fn delete_by_client(&self, client_id: &str) -> AuthResult<u64> {
        let result = query("DELETE FROM studio_authorization_codes WHERE client_id = $1")
            .bind(client_id)
            .execute(self.pool())
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }
}
