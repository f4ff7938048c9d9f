//! OAuth client domain type.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::oauth::redirect::{build_callback_url, validate_redirect_uri};

/// A registered client application.
///
/// Redirect targets are never stored. They are derived from `website_url`
/// and `preview_url_pattern` on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthClient {
    /// Client identifier used in OAuth flows.
    pub id: String,

    /// SHA-256 hex digest of the client secret.
    #[serde(default, skip_serializing)]
    pub secret_hash: String,

    /// Human-readable name shown on the consent page.
    pub name: String,

    /// Canonical origin of the client site, without trailing slash.
    pub website_url: String,

    /// Optional wildcard origin for preview deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url_pattern: Option<String>,

    /// Inactive clients are invisible to every OAuth endpoint.
    pub is_active: bool,

    /// User who registered the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,

    /// When the client was registered.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl OAuthClient {
    /// The canonical callback URL of this client.
    #[must_use]
    pub fn callback_url(&self) -> String {
        build_callback_url(&self.website_url)
    }

    /// Returns `true` if `redirect_uri` is an acceptable target for this client.
    #[must_use]
    pub fn accepts_redirect_uri(&self, redirect_uri: &str) -> bool {
        validate_redirect_uri(
            redirect_uri,
            &self.website_url,
            self.preview_url_pattern.as_deref(),
        )
    }
}
