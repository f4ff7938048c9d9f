//! UserInfo endpoint response.

use serde::{Deserialize, Serialize};

use crate::types::User;

/// Provider tag sent alongside a provider token.
pub const GIT_PROVIDER_GITHUB: &str = "github";

/// Claims returned by `GET /oauth/userinfo`.
///
/// Built from the current user record, so profile changes show up without
/// waiting for a new token. `picture` is always present and may be `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Subject, the user id.
    pub sub: String,

    /// Display name.
    pub name: String,

    /// Email address.
    pub email: String,

    /// Avatar URL.
    pub picture: Option<String>,

    /// Decrypted provider access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// Which provider `github_token` belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_provider: Option<String>,
}

impl UserInfo {
    /// Builds the claims for `user`, attaching `provider_token` when present.
    #[must_use]
    pub fn new(user: &User, provider_token: Option<String>) -> Self {
        Self {
            sub: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            picture: user.avatar.clone(),
            git_provider: provider_token
                .as_ref()
                .map(|_| GIT_PROVIDER_GITHUB.to_string()),
            github_token: provider_token,
        }
    }
}
