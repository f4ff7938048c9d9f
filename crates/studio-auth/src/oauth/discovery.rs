//! OpenID Connect discovery document.
//!
//! Served at `/.well-known/openid-configuration`. Every URL derives from the
//! configured issuer, never from the request.

use serde::Serialize;

use crate::config::AuthConfig;
use crate::oauth::client_auth::TokenEndpointAuthMethod;
use crate::oauth::pkce::PkceChallengeMethod;
use crate::oauth::token::GrantType;
use crate::token::jwt::SIGNING_ALGORITHM_NAME;

/// Path of the discovery document.
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
/// Path of the JWKS document.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";
/// Path of the authorization endpoint.
pub const AUTHORIZE_PATH: &str = "/oauth/authorize";
/// Path of the token endpoint.
pub const TOKEN_PATH: &str = "/oauth/token";
/// Path of the userinfo endpoint.
pub const USERINFO_PATH: &str = "/oauth/userinfo";
/// Path of the revocation endpoint.
pub const REVOKE_PATH: &str = "/oauth/revoke";

const CLAIMS_SUPPORTED: [&str; 10] = [
    "sub",
    "name",
    "email",
    "picture",
    "github_token",
    "git_provider",
    "iss",
    "aud",
    "exp",
    "iat",
];

/// OpenID Provider metadata.
///
/// # Example Response
///
/// ```json
/// {
///   "issuer": "https://auth.example.com",
///   "authorization_endpoint": "https://auth.example.com/oauth/authorize",
///   "token_endpoint": "https://auth.example.com/oauth/token",
///   "response_types_supported": ["code"],
///   "code_challenge_methods_supported": ["S256"]
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryDocument {
    /// Issuer identifier, equal to the `iss` claim.
    pub issuer: String,
    /// Authorization endpoint URL.
    pub authorization_endpoint: String,
    /// Token endpoint URL.
    pub token_endpoint: String,
    /// UserInfo endpoint URL.
    pub userinfo_endpoint: String,
    /// Revocation endpoint URL (RFC 7009).
    pub revocation_endpoint: String,
    /// JWKS URL.
    pub jwks_uri: String,
    /// Supported response types.
    pub response_types_supported: Vec<String>,
    /// Supported grant types.
    pub grant_types_supported: Vec<String>,
    /// Supported subject identifier types.
    pub subject_types_supported: Vec<String>,
    /// ID token signing algorithms.
    pub id_token_signing_alg_values_supported: Vec<String>,
    /// Scope values this server grants.
    pub scopes_supported: Vec<String>,
    /// Client authentication methods at the token endpoint.
    pub token_endpoint_auth_methods_supported: Vec<String>,
    /// Claims that may appear in tokens or userinfo.
    pub claims_supported: Vec<String>,
    /// PKCE methods accepted at the authorization endpoint.
    pub code_challenge_methods_supported: Vec<String>,
}

impl DiscoveryDocument {
    /// Builds the document for `config`.
    #[must_use]
    pub fn build(config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer().to_string(),
            authorization_endpoint: config.endpoint(AUTHORIZE_PATH),
            token_endpoint: config.endpoint(TOKEN_PATH),
            userinfo_endpoint: config.endpoint(USERINFO_PATH),
            revocation_endpoint: config.endpoint(REVOKE_PATH),
            jwks_uri: config.endpoint(JWKS_PATH),
            response_types_supported: vec!["code".to_string()],
            grant_types_supported: GrantType::ALL
                .iter()
                .map(|g| g.as_str().to_string())
                .collect(),
            subject_types_supported: vec!["public".to_string()],
            id_token_signing_alg_values_supported: vec![SIGNING_ALGORITHM_NAME.to_string()],
            scopes_supported: config
                .oauth
                .default_scope
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            token_endpoint_auth_methods_supported: TokenEndpointAuthMethod::ALL
                .iter()
                .map(|m| m.as_str().to_string())
                .collect(),
            claims_supported: CLAIMS_SUPPORTED.iter().map(|c| c.to_string()).collect(),
            code_challenge_methods_supported: vec![PkceChallengeMethod::S256.as_str().to_string()],
        }
    }
}
