//! Shared state of the HTTP handlers.

use std::sync::Arc;

use crate::identity::IdentityProvider;
use crate::oauth::OAuthService;
use crate::storage::SessionStore;

/// State shared by every OAuth route.
#[derive(Clone)]
pub struct AuthState {
    /// Endpoint logic.
    pub service: OAuthService,
    /// Browser session storage.
    pub sessions: Arc<dyn SessionStore>,
    /// Login provider.
    pub identity_provider: Arc<dyn IdentityProvider>,
}

impl AuthState {
    /// Creates the handler state.
    #[must_use]
    pub fn new(
        service: OAuthService,
        sessions: Arc<dyn SessionStore>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            service,
            sessions,
            identity_provider,
        }
    }
}
