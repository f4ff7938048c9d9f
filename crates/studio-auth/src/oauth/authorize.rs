//! Authorization endpoint types.
//!
//! # Flow
//!
//! 1. Client redirects the user to `GET /oauth/authorize`
//! 2. The server stores the validated request in the session and sends the
//!    user to the login page or straight to the consent page
//! 3. The consent page posts `{approved}`; the server answers with the URL to
//!    send the browser to, carrying either `code` or `error=access_denied`
//!
//! # Security Requirements
//!
//! - PKCE is required (`code_challenge`, method `S256`)
//! - The redirect URI must be derived from the client's registered origins

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization request query parameters.
///
/// Every field is optional at the parsing level so that missing parameters
/// produce an OAuth error instead of a deserialization failure.
///
/// # Example
///
/// ```ignore
/// GET /oauth/authorize?
///   response_type=code
///   &client_id=2b4c...
///   &redirect_uri=https://docs.example.com/__nuxt_studio/auth/sso
///   &state=abc123xyz
///   &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM
///   &code_challenge_method=S256
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationRequest {
    /// Must be "code".
    #[serde(default)]
    pub response_type: Option<String>,

    /// Client identifier.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Where the response will be sent.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Requested scope. The granted scope is always the server default.
    #[serde(default)]
    pub scope: Option<String>,

    /// CSRF protection state, echoed back to the client.
    #[serde(default)]
    pub state: Option<String>,

    /// PKCE code challenge.
    #[serde(default)]
    pub code_challenge: Option<String>,

    /// PKCE method; `S256` when absent.
    #[serde(default)]
    pub code_challenge_method: Option<String>,

    /// OpenID Connect nonce.
    #[serde(default)]
    pub nonce: Option<String>,
}

/// Consent decision posted by the consent page.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ConsentDecision {
    /// `true` to approve, anything else denies.
    #[serde(default)]
    pub approved: bool,
}

/// Answer to a consent decision: where the browser goes next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentResponse {
    /// Client redirect URI with the result parameters appended.
    #[serde(rename = "redirectUrl")]
    pub redirect_url: String,
}

/// Successful authorization result.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationResponse {
    /// Authorization code to be exchanged for tokens.
    pub code: String,

    /// Echoed state parameter for CSRF validation.
    pub state: String,
}

impl AuthorizationResponse {
    /// Creates a new authorization response.
    #[must_use]
    pub fn new(code: String, state: String) -> Self {
        Self { code, state }
    }

    /// Builds the redirect URL with response parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `redirect_uri` is not an absolute URL.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        url.query_pairs_mut()
            .append_pair("code", &self.code)
            .append_pair("state", &self.state);
        Ok(url.to_string())
    }
}

/// Authorization error delivered to the client via redirect.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationError {
    /// OAuth 2.0 error code.
    pub error: AuthorizationErrorCode,

    /// Human-readable error description (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Echoed state parameter for CSRF validation.
    pub state: String,
}

impl AuthorizationError {
    /// Creates a new authorization error with description.
    #[must_use]
    pub fn with_description(
        error: AuthorizationErrorCode,
        description: impl Into<String>,
        state: String,
    ) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
            state,
        }
    }

    /// The error sent when the user declines consent.
    #[must_use]
    pub fn user_denied(state: String) -> Self {
        Self::with_description(
            AuthorizationErrorCode::AccessDenied,
            "User denied the authorization request",
            state,
        )
    }

    /// Builds the redirect URL with error parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `redirect_uri` is not an absolute URL.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("error", self.error.as_str());
            if let Some(ref desc) = self.error_description {
                pairs.append_pair("error_description", desc);
            }
            pairs.append_pair("state", &self.state);
        }
        Ok(url.to_string())
    }
}

/// OAuth 2.0 authorization error codes (RFC 6749 Section 4.1.2.1) used on
/// the redirect back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorCode {
    /// The resource owner denied the request.
    AccessDenied,

    /// The server failed while completing an approved request.
    ServerError,
}

impl AuthorizationErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "access_denied",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for AuthorizationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
