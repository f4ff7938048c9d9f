//! Browser session context.
//!
//! The HTTP layer loads a [`SessionData`] for each request and passes it to
//! the orchestrator as `&mut SessionData`. The orchestrator only reads and
//! writes fields on this value; persisting it and setting cookies is the
//! caller's job.
//!
//! # Lifecycle of a pending request
//!
//! 1. `/oauth/authorize` validates the request and stores it here
//! 2. The user logs in; the pending request survives the login
//! 3. The consent decision clears it, whatever the decision was

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::oauth::pkce::PkceChallengeMethod;
use crate::types::User;

/// Per-browser session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// Logged-in user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,

    /// Authorization request waiting for login or consent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_request: Option<PendingOAuthRequest>,

    /// CSRF state of an in-flight identity provider login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_state: Option<String>,
}

impl SessionData {
    /// Returns `true` when a user is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// The logged-in user as recorded in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    /// User id.
    pub id: Uuid,
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Administrator flag.
    pub is_admin: bool,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// A validated authorization request waiting for login and consent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOAuthRequest {
    /// Requesting client.
    pub client_id: String,
    /// Validated redirect URI.
    pub redirect_uri: String,
    /// Requested scope.
    pub scope: String,
    /// Client state, echoed on the final redirect.
    pub state: String,
    /// PKCE challenge.
    pub code_challenge: String,
    /// PKCE method.
    pub code_challenge_method: PkceChallengeMethod,
    /// OpenID Connect nonce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Client display name for the consent page. Only set once the user is
    /// known to be logged in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_is_anonymous() {
        let session = SessionData::default();
        assert!(!session.is_authenticated());
        assert!(session.oauth_request.is_none());
        assert_eq!(serde_json::to_value(&session).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_pending_request_wire_format() {
        let pending = PendingOAuthRequest {
            client_id: "c1".to_string(),
            redirect_uri: "https://docs.example.com/__nuxt_studio/auth/sso".to_string(),
            scope: "openid".to_string(),
            state: "xyz".to_string(),
            code_challenge: "abc".to_string(),
            code_challenge_method: PkceChallengeMethod::S256,
            nonce: None,
            client_name: Some("Docs".to_string()),
        };
        let json = serde_json::to_value(&pending).unwrap();
        assert_eq!(json["clientId"], "c1");
        assert_eq!(json["codeChallengeMethod"], "S256");
        assert_eq!(json["clientName"], "Docs");
        assert!(json.get("nonce").is_none());

        let back: PendingOAuthRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, pending);
    }
}
