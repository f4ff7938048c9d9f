//! User storage trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::User;

/// Storage trait for end users.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Finds a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>>;

    /// Finds a user by identity provider id, falling back to email.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_provider_id_or_email(
        &self,
        provider_id: &str,
        email: &str,
    ) -> AuthResult<Option<User>>;

    /// Stores a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the id or email is taken or the storage operation
    /// fails.
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Replaces an existing user.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or the storage operation
    /// fails.
    async fn update(&self, user: &User) -> AuthResult<()>;

    /// Number of stored users.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn count(&self) -> AuthResult<u64>;
}
