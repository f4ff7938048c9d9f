//! Refresh token lifecycle.
//!
//! Tokens are 64 random bytes, hex encoded. Only the SHA-256 digest is
//! stored. Exchange does not rotate the token: the same value keeps working
//! until it expires or is revoked.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::secret::{REFRESH_TOKEN_BYTES, generate_secure_token, hash_token};
use crate::storage::RefreshTokenStorage;
use crate::types::RefreshToken;

const INVALID_REFRESH_TOKEN: &str = "Invalid or expired refresh token";

/// Result of a successful refresh token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshGrant {
    /// The user the token was issued for.
    pub user_id: Uuid,
    /// Scope of the original grant.
    pub scope: String,
    /// Id of the stored token record.
    pub token_id: Uuid,
}

/// Issues, exchanges and revokes refresh tokens.
#[derive(Clone)]
pub struct RefreshTokenService {
    tokens: Arc<dyn RefreshTokenStorage>,
    lifetime: Duration,
}

impl RefreshTokenService {
    /// Creates a new service issuing tokens valid for `lifetime`.
    #[must_use]
    pub fn new(tokens: Arc<dyn RefreshTokenStorage>, lifetime: Duration) -> Self {
        Self { tokens, lifetime }
    }

    /// Issues a refresh token and returns its plaintext value.
    ///
    /// This is the only time the plaintext is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be stored.
    pub async fn issue(&self, client_id: &str, user_id: Uuid, scope: &str) -> AuthResult<String> {
        let token = generate_secure_token(REFRESH_TOKEN_BYTES);

        let record = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: hash_token(&token),
            client_id: client_id.to_string(),
            user_id,
            scope: scope.to_string(),
            expires_at: OffsetDateTime::now_utc() + self.lifetime,
            revoked_at: None,
        };
        self.tokens.create(&record).await?;

        tracing::debug!(client_id = %client_id, token_id = %record.id, "Issued refresh token");
        Ok(token)
    }

    /// Validates a presented token for `client_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidGrant` if the token is unknown, revoked,
    /// issued to another client or expired.
    pub async fn exchange(&self, token: &str, client_id: &str) -> AuthResult<RefreshGrant> {
        let token_hash = hash_token(token);

        let Some(record) = self.tokens.find_active(&token_hash, client_id).await? else {
            tracing::debug!(client_id = %client_id, "Refresh token not found or revoked");
            return Err(AuthError::invalid_grant(INVALID_REFRESH_TOKEN));
        };

        if record.is_expired_at(OffsetDateTime::now_utc()) {
            tracing::debug!(token_id = %record.id, "Refresh token expired");
            return Err(AuthError::invalid_grant(INVALID_REFRESH_TOKEN));
        }

        Ok(RefreshGrant {
            user_id: record.user_id,
            scope: record.scope,
            token_id: record.id,
        })
    }

    /// Revokes a token by its plaintext value.
    ///
    /// Returns `false` for unknown or already revoked tokens; neither is an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn revoke(&self, token: &str) -> AuthResult<bool> {
        self.tokens.revoke(&hash_token(token)).await
    }

    /// Revokes all of a user's tokens, optionally only for one client.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn revoke_all(&self, user_id: Uuid, client_id: Option<&str>) -> AuthResult<u64> {
        let revoked = self.tokens.revoke_all(user_id, client_id).await?;
        tracing::info!(user_id = %user_id, client_id = ?client_id, revoked, "Revoked refresh tokens");
        Ok(revoked)
    }
}
