//! Refresh token domain type.
//!
//! # Security
//!
//! - Refresh tokens are stored as SHA-256 hashes, never plaintext
//! - Tokens can be revoked individually or per user/client
//! - Revoked tokens are kept for the audit trail

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Refresh token record.
///
/// The plaintext token is returned to the client once, at issuance. Lookup
/// hashes the presented value and searches by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Unique identifier for this refresh token record.
    pub id: Uuid,

    /// SHA-256 hex digest of the token value.
    pub token_hash: String,

    /// Client ID that this token was issued to.
    pub client_id: String,

    /// User who authorized the grant.
    pub user_id: Uuid,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// When this token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When this token was revoked (None = not revoked).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl RefreshToken {
    /// Returns `true` if this token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }

    /// Returns `true` if this token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}
