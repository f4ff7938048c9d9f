//! End-user domain type.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::token::jwt::TokenProfile;

/// A user known through the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable user identifier, the `sub` claim of every token.
    pub id: Uuid,

    /// Unique email address.
    pub email: String,

    /// Display name.
    pub name: String,

    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Identifier at the identity provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    /// Encrypted provider access token.
    #[serde(default, skip_serializing)]
    pub provider_token: Option<String>,

    /// Administrators may manage clients.
    pub is_admin: bool,

    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Last profile update.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Profile values copied into access and ID tokens.
    #[must_use]
    pub fn token_profile(&self) -> TokenProfile {
        TokenProfile {
            name: self.name.clone(),
            email: self.email.clone(),
            picture: self.avatar.clone(),
        }
    }
}
