//! Authorization code storage trait.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::types::AuthorizationCode;

/// Storage trait for authorization codes.
///
/// # Concurrency
///
/// [`take`](Self::take) must be atomic: when several callers take the same
/// code concurrently, exactly one of them receives the row. Implementations
/// use a single delete-returning operation rather than a read followed by a
/// delete.
#[async_trait]
pub trait AuthorizationCodeStorage: Send + Sync {
    /// Stores a newly issued code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Removes the code and returns it, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn take(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Deletes every code with `expires_at < now` and returns how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;

    /// Deletes every code issued to `client_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_by_client(&self, client_id: &str) -> AuthResult<u64>;
}
