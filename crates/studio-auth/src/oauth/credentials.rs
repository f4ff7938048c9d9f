//! Client registry access and client secret verification.

use std::sync::Arc;

use crate::AuthResult;
use crate::secret::verify_token_hash;
use crate::storage::ClientStorage;
use crate::types::OAuthClient;

/// Read access to the client registry as seen by the OAuth endpoints.
///
/// Inactive clients are indistinguishable from unknown ones.
#[derive(Clone)]
pub struct CredentialStore {
    clients: Arc<dyn ClientStorage>,
}

impl CredentialStore {
    /// Creates a credential store over `clients`.
    #[must_use]
    pub fn new(clients: Arc<dyn ClientStorage>) -> Self {
        Self { clients }
    }

    /// Looks up an active client.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_client(&self, client_id: &str) -> AuthResult<Option<OAuthClient>> {
        Ok(self
            .clients
            .find_by_id(client_id)
            .await?
            .filter(|client| client.is_active))
    }

    /// Returns the client if it is active and `secret` hashes to its stored
    /// secret hash. The digests are compared in constant time.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn verify_client_credentials(
        &self,
        client_id: &str,
        secret: &str,
    ) -> AuthResult<Option<OAuthClient>> {
        let Some(client) = self.get_client(client_id).await? else {
            tracing::debug!(client_id = %client_id, "Unknown or inactive client");
            return Ok(None);
        };

        if verify_token_hash(secret, &client.secret_hash) {
            Ok(Some(client))
        } else {
            tracing::debug!(client_id = %client_id, "Client secret mismatch");
            Ok(None)
        }
    }
}
