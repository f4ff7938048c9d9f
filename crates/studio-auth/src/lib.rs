//! # studio-auth
//!
//! OAuth 2.1 / OpenID Connect authorization server for Nuxt Studio.
//!
//! This crate provides:
//! - The authorization code flow with mandatory PKCE (`S256`)
//! - Refresh tokens, revocation and the UserInfo endpoint
//! - RS256-signed access and ID tokens with a published JWKS
//! - Browser login through GitHub
//! - Storage traits and an in-memory implementation
//!
//! ## Overview
//!
//! Studio instances are registered clients identified by their website URL.
//! A client may only redirect to `<website>/__nuxt_studio/auth/sso`, or to the
//! same path on a host matching its preview URL pattern.
//!
//! ## Modules
//!
//! - [`config`] - Server configuration
//! - [`oauth`] - Protocol services and the orchestrating [`oauth::OAuthService`]
//! - [`token`] - Token signing and verification
//! - [`identity`] - Login provider and provider-token encryption
//! - [`storage`] - Storage traits for clients, users, codes, tokens and sessions
//! - [`http`] - Axum HTTP handlers for the OAuth endpoints

pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod oauth;
pub mod secret;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory};
pub use http::{AuthState, router};
pub use identity::{
    AesGcmTokenCipher, ExternalIdentity, GithubIdentityProvider, IdentityProvider,
    ProviderTokenCipher,
};
pub use oauth::{OAuthService, SessionData};
pub use storage::{
    AuthStores, AuthorizationCodeStorage, ClientStorage, InMemoryAuthStorage,
    RefreshTokenStorage, SessionStore, UserStorage,
};
pub use token::{JwtService, SigningKeyPair};
pub use types::{AuthorizationCode, OAuthClient, RefreshToken, User};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use studio_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{AuthState, router};
    pub use crate::identity::{AesGcmTokenCipher, GithubIdentityProvider, IdentityProvider};
    pub use crate::oauth::{ClientRegistration, OAuthService, SessionData};
    pub use crate::storage::{
        AuthStores, AuthorizationCodeStorage, ClientStorage, InMemoryAuthStorage,
        RefreshTokenStorage, SessionStore, UserStorage,
    };
    pub use crate::token::{JwtService, SigningKeyPair};
    pub use crate::types::{OAuthClient, User};
}
