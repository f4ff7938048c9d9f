//! Client registry storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::OAuthClient;

/// Storage trait for OAuth client registrations.
///
/// Lookups return inactive clients too; filtering to active clients is the
/// caller's decision (see [`CredentialStore`](crate::oauth::credentials::CredentialStore)).
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Finds a client by its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, client_id: &str) -> AuthResult<Option<OAuthClient>>;

    /// Stores a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if a client with the same id exists or the storage
    /// operation fails.
    async fn create(&self, client: &OAuthClient) -> AuthResult<()>;

    /// Replaces an existing client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client does not exist or the storage operation
    /// fails.
    async fn update(&self, client: &OAuthClient) -> AuthResult<()>;

    /// Deletes a client together with its authorization codes and refresh
    /// tokens. Returns `false` if no such client existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, client_id: &str) -> AuthResult<bool>;

    /// Lists all active clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_active(&self) -> AuthResult<Vec<OAuthClient>>;
}
