//! Authorization code domain type.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::oauth::pkce::PkceChallengeMethod;

/// A pending authorization code.
///
/// Codes are stored as issued (not hashed). They live for minutes and are
/// deleted by the first redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    /// The code value, primary key.
    pub code: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// User who approved the request.
    pub user_id: Uuid,

    /// Redirect URI used at issuance; must match byte for byte at redemption.
    pub redirect_uri: String,

    /// Granted scope.
    pub scope: String,

    /// PKCE challenge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE method; `S256` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<PkceChallengeMethod>,

    /// OpenID Connect nonce, echoed in the ID token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Expiry instant.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthorizationCode {
    /// Returns `true` once `now` is past `expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }
}
