//! End-user identity acquisition.
//!
//! - [`provider`] - the [`IdentityProvider`] trait and [`ExternalIdentity`]
//! - [`github`] - GitHub implementation
//! - [`cipher`] - encryption of provider access tokens at rest

pub mod cipher;
pub mod github;
pub mod provider;

pub use cipher::{AesGcmTokenCipher, CipherError, ProviderTokenCipher};
pub use github::GithubIdentityProvider;
pub use provider::{ExternalIdentity, IdentityProvider};
