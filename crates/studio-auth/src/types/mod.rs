//! Domain types shared by the storage layer and the protocol services.
//!
//! - [`OAuthClient`] - registered client application
//! - [`User`] - end user known through the identity provider
//! - [`AuthorizationCode`] - single-use grant artifact
//! - [`RefreshToken`] - hashed long-lived credential

pub mod authorization_code;
pub mod client;
pub mod refresh_token;
pub mod user;

pub use authorization_code::AuthorizationCode;
pub use client::OAuthClient;
pub use refresh_token::RefreshToken;
pub use user::User;
