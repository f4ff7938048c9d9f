//! Refresh token storage trait.
//!
//! # Security Considerations
//!
//! - Tokens are stored as SHA-256 hashes only
//! - Revocation must be atomic and immediate
//! - Revoked tokens are retained, never physically deleted

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::RefreshToken;

/// Storage trait for refresh tokens.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Stores a new refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be stored (e.g., duplicate hash,
    /// storage unavailable).
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Finds an unrevoked token by hash that was issued to `client_id`.
    ///
    /// Expiry is not checked here.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_active(
        &self,
        token_hash: &str,
        client_id: &str,
    ) -> AuthResult<Option<RefreshToken>>;

    /// Marks the token revoked.
    ///
    /// Returns `true` if an unrevoked token was found and revoked. Revoking
    /// an unknown or already revoked token returns `false` and is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, token_hash: &str) -> AuthResult<bool>;

    /// Revokes every unrevoked token of `user_id`, optionally only those
    /// issued to `client_id`. Returns the number of tokens revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke_all(&self, user_id: Uuid, client_id: Option<&str>) -> AuthResult<u64>;

    /// Revokes every unrevoked token issued to `client_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke_by_client(&self, client_id: &str) -> AuthResult<u64>;
}
