//! Storage traits for authorization server data.
//!
//! This module defines storage interfaces for:
//!
//! - OAuth client registrations
//! - Users
//! - Authorization codes
//! - Refresh tokens
//! - Browser sessions
//!
//! # Implementations
//!
//! - [`InMemoryAuthStorage`] - process-local store for tests and single-node setups
//! - `studio-auth-postgres` - PostgreSQL storage backend

use std::sync::Arc;

pub mod authorization_code;
pub mod client;
pub mod memory;
pub mod refresh_token;
pub mod session;
pub mod user;

pub use authorization_code::AuthorizationCodeStorage;
pub use client::ClientStorage;
pub use memory::InMemoryAuthStorage;
pub use refresh_token::RefreshTokenStorage;
pub use session::SessionStore;
pub use user::UserStorage;

/// The entity stores the protocol services run against.
///
/// Each field may point at a different backend; [`AuthStores::from_backend`]
/// covers the usual case of one backend implementing every trait.
#[derive(Clone)]
pub struct AuthStores {
    /// Registered clients.
    pub clients: Arc<dyn ClientStorage>,
    /// End users.
    pub users: Arc<dyn UserStorage>,
    /// Authorization codes.
    pub codes: Arc<dyn AuthorizationCodeStorage>,
    /// Refresh tokens.
    pub refresh_tokens: Arc<dyn RefreshTokenStorage>,
}

impl AuthStores {
    /// Uses `backend` for every entity.
    #[must_use]
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: ClientStorage + UserStorage + AuthorizationCodeStorage + RefreshTokenStorage + 'static,
    {
        Self {
            clients: backend.clone(),
            users: backend.clone(),
            codes: backend.clone(),
            refresh_tokens: backend,
        }
    }
}
