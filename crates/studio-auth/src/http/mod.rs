//! HTTP handlers for the OAuth 2.0 / OpenID Connect endpoints.
//!
//! This module provides Axum handlers and a [`router`] mounting them.
//!
//! # Available Handlers
//!
//! - [`discovery`] - Discovery document and JWKS
//! - [`authorize`] - Authorization request and consent decision
//! - [`token`] - Token endpoint
//! - [`revoke`] - Token revocation endpoint (RFC 7009)
//! - [`userinfo`] - UserInfo endpoint
//! - [`login`] - Browser login through GitHub

pub mod authorize;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod login;
pub mod revoke;
pub mod session;
pub mod state;
pub mod token;
pub mod userinfo;

use axum::Router;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};

use crate::oauth::discovery::{
    AUTHORIZE_PATH, DISCOVERY_PATH, JWKS_PATH, REVOKE_PATH, TOKEN_PATH, USERINFO_PATH,
};

pub use authorize::{authorize_handler, consent_handler};
pub use discovery::{discovery_handler, jwks_handler};
pub use error::OAuthErrorBody;
pub use login::{GITHUB_LOGIN_PATH, github_login_handler};
pub use revoke::revoke_handler;
pub use session::BrowserSession;
pub use state::AuthState;
pub use token::token_handler;
pub use userinfo::userinfo_handler;

/// Builds the router serving every OAuth endpoint.
pub fn router(state: AuthState) -> Router {
    Router::new()
        .route(DISCOVERY_PATH, get(discovery_handler))
        .route(JWKS_PATH, get(jwks_handler))
        .route(AUTHORIZE_PATH, get(authorize_handler).post(consent_handler))
        .route(TOKEN_PATH, post(token_handler))
        .route(REVOKE_PATH, post(revoke_handler))
        .route(USERINFO_PATH, get(userinfo_handler))
        .route(GITHUB_LOGIN_PATH, get(github_login_handler))
        .with_state(state)
}

/// `302 Found` to `location`.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
