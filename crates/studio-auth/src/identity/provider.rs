//! The identity provider seam.
//!
//! An identity provider answers "who is logging in". The authorization
//! server only needs two things from it: where to send the browser, and how
//! to turn the callback `code` into a profile.

use async_trait::async_trait;

use crate::AuthResult;

/// Profile returned by an identity provider after a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Stable identifier at the provider.
    pub provider_id: String,

    /// Verified email address, if the provider released one.
    pub email: Option<String>,

    /// Display name.
    pub name: String,

    /// Avatar URL.
    pub avatar: Option<String>,

    /// Provider access token, stored encrypted.
    pub provider_token: Option<String>,
}

/// An external login provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &'static str;

    /// URL the browser is redirected to in order to log in.
    ///
    /// `state` is echoed back on the callback and must be checked by the
    /// caller.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchanges a callback `code` for the user's profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IdentityProvider` when the provider rejects the
    /// code or cannot be reached.
    async fn exchange(&self, code: &str) -> AuthResult<ExternalIdentity>;
}
