//! Authorization code issuance and redemption.
//!
//! # Redemption order
//!
//! 1. Atomically take the code out of storage
//! 2. Compare client id and redirect URI (exact string equality)
//! 3. Check expiry
//! 4. Verify PKCE when a challenge was stored
//! 5. Resolve the bound user
//!
//! Step 1 happens before any check, so a code is gone after the first
//! redemption attempt whether or not that attempt succeeds. Two concurrent
//! redemptions can never both see the code.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::pkce::verify_challenge;
use crate::oauth::session::PendingOAuthRequest;
use crate::secret::{AUTHORIZATION_CODE_BYTES, generate_secure_token};
use crate::storage::{AuthorizationCodeStorage, UserStorage};
use crate::types::{AuthorizationCode, User};

const INVALID_CODE: &str = "Invalid or expired authorization code";

/// Result of a successful redemption.
#[derive(Debug, Clone)]
pub struct ConsumedCode {
    /// The user who approved the request, as currently stored.
    pub user: User,
    /// Granted scope.
    pub scope: String,
    /// OpenID Connect nonce from the authorization request.
    pub nonce: Option<String>,
}

/// Issues and redeems single-use authorization codes.
#[derive(Clone)]
pub struct AuthorizationCodeService {
    codes: Arc<dyn AuthorizationCodeStorage>,
    users: Arc<dyn UserStorage>,
    lifetime: Duration,
}

impl AuthorizationCodeService {
    /// Creates a new service. Codes expire `lifetime` after issuance.
    #[must_use]
    pub fn new(
        codes: Arc<dyn AuthorizationCodeStorage>,
        users: Arc<dyn UserStorage>,
        lifetime: Duration,
    ) -> Self {
        Self {
            codes,
            users,
            lifetime,
        }
    }

    /// Issues a code for an approved request and returns its value.
    ///
    /// # Errors
    ///
    /// Returns an error if the code cannot be stored.
    pub async fn issue(&self, user_id: Uuid, request: &PendingOAuthRequest) -> AuthResult<String> {
        let code = generate_secure_token(AUTHORIZATION_CODE_BYTES);

        let row = AuthorizationCode {
            code: code.clone(),
            client_id: request.client_id.clone(),
            user_id,
            redirect_uri: request.redirect_uri.clone(),
            scope: request.scope.clone(),
            code_challenge: Some(request.code_challenge.clone()),
            code_challenge_method: Some(request.code_challenge_method),
            nonce: request.nonce.clone(),
            expires_at: OffsetDateTime::now_utc() + self.lifetime,
        };
        self.codes.create(&row).await?;

        tracing::debug!(
            client_id = %request.client_id,
            user_id = %user_id,
            "Issued authorization code"
        );
        Ok(code)
    }

    /// Redeems a code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidGrant` for every validation failure and a
    /// storage error if storage fails.
    pub async fn consume(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> AuthResult<ConsumedCode> {
        let Some(row) = self.codes.take(code).await? else {
            tracing::debug!(client_id = %client_id, "Authorization code not found");
            return Err(AuthError::invalid_grant(INVALID_CODE));
        };

        if row.client_id != client_id || row.redirect_uri != redirect_uri {
            tracing::warn!(
                client_id = %client_id,
                "Authorization code presented with mismatched client or redirect URI"
            );
            return Err(AuthError::invalid_grant(INVALID_CODE));
        }

        if row.is_expired_at(OffsetDateTime::now_utc()) {
            tracing::debug!(client_id = %client_id, "Authorization code expired");
            return Err(AuthError::invalid_grant(INVALID_CODE));
        }

        if let Some(challenge) = &row.code_challenge {
            let method = row.code_challenge_method.unwrap_or_default();
            let verified = code_verifier
                .is_some_and(|verifier| verify_challenge(verifier, challenge, method));
            if !verified {
                tracing::debug!(client_id = %client_id, "PKCE verification failed");
                return Err(AuthError::invalid_grant(INVALID_CODE));
            }
        }

        let Some(user) = self.users.find_by_id(row.user_id).await? else {
            tracing::warn!(user_id = %row.user_id, "Authorization code bound to unknown user");
            return Err(AuthError::invalid_grant(INVALID_CODE));
        };

        Ok(ConsumedCode {
            user,
            scope: row.scope,
            nonce: row.nonce,
        })
    }

    /// Deletes codes that expired before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn sweep_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        self.codes.delete_expired(now).await
    }
}
