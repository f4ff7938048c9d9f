//! Access token and ID token minting.
//!
//! Both token kinds are built from the *current* user record, so a profile
//! change shows up in the next token without re-consent.
//!
//! # Usage
//!
//! ```ignore
//! use studio_auth::token::{TokenConfig, TokenService};
//!
//! let config = TokenConfig::new("https://auth.example.com");
//! let service = TokenService::new(jwt_service, config);
//!
//! let access_token = service.mint_access_token(&user, &client.id, &scope)?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::AuthError;
use crate::token::jwt::{
    AccessTokenClaims, IdTokenClaims, JwtError, JwtService, Jwks, VerifyOptions,
};
use crate::types::User;

/// Configuration for the token service.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Server issuer URL (included in tokens as `iss`).
    pub issuer: String,

    /// Lifetime of access tokens and ID tokens.
    pub access_token_lifetime: Duration,
}

impl TokenConfig {
    /// Creates a new token configuration with a one hour lifetime.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            access_token_lifetime: Duration::from_secs(3600),
        }
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Lifetime in whole seconds, as reported in `expires_in`.
    #[must_use]
    pub fn expires_in(&self) -> u64 {
        self.access_token_lifetime.as_secs()
    }
}

/// Mints and verifies the JWTs this server issues.
#[derive(Clone)]
pub struct TokenService {
    /// JWT service for encoding/decoding tokens.
    jwt_service: Arc<JwtService>,

    /// Service configuration.
    config: TokenConfig,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(jwt_service: Arc<JwtService>, config: TokenConfig) -> Self {
        Self {
            jwt_service,
            config,
        }
    }

    /// Mints an access token for `user`, audience `client_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if signing fails.
    pub fn mint_access_token(&self, user: &User, client_id: &str, scope: &str) -> AuthResult<String> {
        let claims = AccessTokenClaims::builder(&self.config.issuer, user.id.to_string(), client_id)
            .scope(scope)
            .profile(&user.token_profile())
            .expires_in_seconds(self.lifetime_seconds())
            .build();

        self.jwt_service
            .sign(&claims)
            .map_err(|e| AuthError::internal(format!("Failed to sign access token: {e}")))
    }

    /// Mints an OpenID Connect ID token for `user`, audience `client_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if signing fails.
    pub fn mint_id_token(
        &self,
        user: &User,
        client_id: &str,
        nonce: Option<&str>,
    ) -> AuthResult<String> {
        let iat = OffsetDateTime::now_utc().unix_timestamp();
        let profile = user.token_profile();

        let claims = IdTokenClaims {
            sub: user.id.to_string(),
            iss: self.config.issuer.clone(),
            aud: client_id.to_string(),
            exp: iat + self.lifetime_seconds(),
            iat,
            name: profile.name,
            email: profile.email,
            picture: profile.picture,
            nonce: nonce.map(str::to_string),
        };

        self.jwt_service
            .sign(&claims)
            .map_err(|e| AuthError::internal(format!("Failed to sign ID token: {e}")))
    }

    /// Verifies an access token issued by this server.
    ///
    /// No audience is enforced: a token issued to any client is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::InvalidToken`] for every verification failure.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        self.jwt_service
            .verify(token, &VerifyOptions::issuer(&self.config.issuer))
    }

    /// Returns the JWKS of the active signing key.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        self.jwt_service.jwks()
    }

    /// Returns the service configuration.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    fn lifetime_seconds(&self) -> i64 {
        i64::try_from(self.config.access_token_lifetime.as_secs()).unwrap_or(i64::MAX / 2)
    }
}
