//! Client authentication for the token and revocation endpoints.
//!
//! # Authentication Methods
//!
//! - `client_secret_basic` - HTTP Basic Auth with client_id:client_secret
//! - `client_secret_post` - client_id and client_secret in request body
//!
//! When an `Authorization: Basic` header is present it is used exclusively;
//! body credentials are only consulted without one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::credentials::CredentialStore;
use crate::types::OAuthClient;

/// Token endpoint authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    /// Client secret via HTTP Basic Auth.
    ClientSecretBasic,

    /// Client secret in request body.
    ClientSecretPost,
}

impl TokenEndpointAuthMethod {
    /// Every supported method, as advertised in discovery.
    pub const ALL: [Self; 2] = [Self::ClientSecretPost, Self::ClientSecretBasic];

    /// Returns the string representation of the auth method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
        }
    }
}

impl fmt::Display for TokenEndpointAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Client credentials presented with a request.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Client identifier.
    pub client_id: String,
    /// Plaintext client secret.
    pub client_secret: String,
    /// Where the credentials came from.
    pub method: TokenEndpointAuthMethod,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("method", &self.method)
            .finish()
    }
}

impl ClientCredentials {
    /// Picks the credentials from the `Authorization` header or, without a
    /// Basic header, from the body parameters.
    ///
    /// Returns `None` if either the id or the secret is missing or empty.
    #[must_use]
    pub fn extract(
        authorization: Option<&str>,
        body_client_id: Option<&str>,
        body_client_secret: Option<&str>,
    ) -> Option<Self> {
        let (client_id, client_secret, method) = match authorization {
            Some(header) if header.trim_start().starts_with("Basic ") => {
                let (id, secret) = parse_basic_auth(header)?;
                (id, secret, TokenEndpointAuthMethod::ClientSecretBasic)
            }
            _ => (
                body_client_id?.to_string(),
                body_client_secret?.to_string(),
                TokenEndpointAuthMethod::ClientSecretPost,
            ),
        };

        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            client_id,
            client_secret,
            method,
        })
    }
}

/// Authenticates a client.
///
/// # Errors
///
/// Returns `AuthError::InvalidClient` with "Client credentials required" when
/// no credentials were presented and "Invalid client credentials" when they
/// do not match an active client. Unknown clients and wrong secrets produce
/// the same error.
pub async fn authenticate_client(
    credentials: Option<ClientCredentials>,
    store: &CredentialStore,
) -> AuthResult<OAuthClient> {
    let credentials =
        credentials.ok_or_else(|| AuthError::invalid_client("Client credentials required"))?;

    match store
        .verify_client_credentials(&credentials.client_id, &credentials.client_secret)
        .await?
    {
        Some(client) => {
            tracing::debug!(
                client_id = %client.id,
                method = %credentials.method,
                "Client authenticated"
            );
            Ok(client)
        }
        None => Err(AuthError::invalid_client("Invalid client credentials")),
    }
}

/// Parses HTTP Basic Auth header value.
///
/// Returns `Some((client_id, client_secret))` if valid, `None` otherwise.
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // Split on first colon (password may contain colons)
    let (client_id, client_secret) = credentials.split_once(':')?;

    Some((client_id.to_string(), client_secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    fn basic(id: &str, secret: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{id}:{secret}")))
    }

    #[test]
    fn test_parse_basic_auth() {
        let header = basic("client_id", "client:secret");
        assert_eq!(
            parse_basic_auth(&header),
            Some(("client_id".to_string(), "client:secret".to_string()))
        );
        assert_eq!(parse_basic_auth("Bearer abc"), None);
        assert_eq!(parse_basic_auth("Basic !!!"), None);
        assert_eq!(
            parse_basic_auth(&format!("Basic {}", STANDARD.encode("no-colon"))),
            None
        );
    }

    #[test]
    fn test_extract_prefers_basic_header() {
        let header = basic("from-header", "secret-1");
        let creds =
            ClientCredentials::extract(Some(&header), Some("from-body"), Some("secret-2")).unwrap();
        assert_eq!(creds.client_id, "from-header");
        assert_eq!(creds.method, TokenEndpointAuthMethod::ClientSecretBasic);
    }

    #[test]
    fn test_extract_from_body() {
        let creds = ClientCredentials::extract(None, Some("c1"), Some("s1")).unwrap();
        assert_eq!(creds.client_id, "c1");
        assert_eq!(creds.client_secret, "s1");
        assert_eq!(creds.method, TokenEndpointAuthMethod::ClientSecretPost);

        // a non-Basic authorization header falls back to the body
        let creds = ClientCredentials::extract(Some("Bearer x"), Some("c1"), Some("s1")).unwrap();
        assert_eq!(creds.method, TokenEndpointAuthMethod::ClientSecretPost);
    }

    #[test]
    fn test_extract_requires_both_parts() {
        assert!(ClientCredentials::extract(None, Some("c1"), None).is_none());
        assert!(ClientCredentials::extract(None, None, Some("s1")).is_none());
        assert!(ClientCredentials::extract(None, Some("c1"), Some("")).is_none());
        assert!(ClientCredentials::extract(Some(&basic("c1", "")), None, None).is_none());
        // a malformed Basic header does not fall back to the body
        assert!(ClientCredentials::extract(Some("Basic %%%"), Some("c1"), Some("s1")).is_none());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = ClientCredentials::extract(None, Some("c1"), Some("hunter2")).unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
    }
}
