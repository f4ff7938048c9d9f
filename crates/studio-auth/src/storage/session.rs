//! Browser session storage trait.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::oauth::session::SessionData;

/// Key-value store for browser sessions, keyed by the opaque id held in the
/// session cookie.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads an unexpired session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn load(&self, session_id: &str) -> AuthResult<Option<SessionData>>;

    /// Creates or replaces a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn save(
        &self,
        session_id: &str,
        data: &SessionData,
        expires_at: OffsetDateTime,
    ) -> AuthResult<()>;

    /// Removes a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn remove(&self, session_id: &str) -> AuthResult<()>;

    /// Deletes sessions that expired before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}
