//! Authorization server configuration.
//!
//! Every section deserializes with `#[serde(default)]`, so a configuration
//! file only needs the values that differ from the defaults. Durations use
//! humantime notation (`"10m"`, `"1h"`, `"30d"`).
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! issuer = "https://auth.example.com"
//!
//! [auth.oauth]
//! access_token_lifetime = "1h"
//! refresh_token_lifetime = "30d"
//!
//! [auth.signing]
//! private_key_path = "keys/private.pem"
//! public_key_path = "keys/public.pem"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root authorization server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Public base URL of this server.
    /// Used as the `iss` claim and as the base of every advertised endpoint.
    pub issuer: String,

    /// OAuth 2.0 protocol settings.
    pub oauth: OAuthConfig,

    /// Token signing key configuration.
    pub signing: SigningConfig,

    /// Browser session cookie settings.
    pub session: SessionConfig,

    /// Paths of the user-facing pages the server redirects to.
    pub ui: UiConfig,

    /// Provider token encryption settings.
    pub encryption: EncryptionConfig,

    /// GitHub login settings.
    pub github: GithubConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:3000".to_string(),
            oauth: OAuthConfig::default(),
            signing: SigningConfig::default(),
            session: SessionConfig::default(),
            ui: UiConfig::default(),
            encryption: EncryptionConfig::default(),
            github: GithubConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Returns the issuer without a trailing slash.
    #[must_use]
    pub fn issuer(&self) -> &str {
        self.issuer.trim_end_matches('/')
    }

    /// Builds an absolute endpoint URL below the issuer.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.issuer(), path)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The issuer is empty or not an absolute http(s) URL
    /// - Any token lifetime is zero
    /// - The default scope is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        match url::Url::parse(&self.issuer) {
            Ok(url) if url.scheme() == "https" || url.scheme() == "http" => {}
            _ => {
                return Err(ConfigError::InvalidValue(format!(
                    "issuer must be an absolute http(s) URL, got '{}'",
                    self.issuer
                )));
            }
        }

        if self.oauth.authorization_code_lifetime.is_zero()
            || self.oauth.access_token_lifetime.is_zero()
            || self.oauth.refresh_token_lifetime.is_zero()
        {
            return Err(ConfigError::InvalidValue(
                "token lifetimes must be > 0".to_string(),
            ));
        }

        if self.oauth.default_scope.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "default_scope cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// OAuth 2.0 configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Access token and ID token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Scope used when an authorization request carries none.
    pub default_scope: String,

    /// Period of the expired code and session sweep.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            access_token_lifetime: Duration::from_secs(3600),      // 1 hour
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
            default_scope: "openid profile email git:github".to_string(),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

/// Token signing configuration.
///
/// One RS256 keypair is active at a time. Keys are PEM encoded, either inline
/// or read from files; inline values win when both are present.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Key identifier placed in the JWT header and the JWKS.
    pub key_id: String,

    /// PKCS#8 private key PEM.
    pub private_key_pem: Option<String>,

    /// SPKI public key PEM.
    pub public_key_pem: Option<String>,

    /// Path to the private key PEM file.
    pub private_key_path: Option<PathBuf>,

    /// Path to the public key PEM file.
    pub public_key_path: Option<PathBuf>,

    /// Generate a throwaway keypair at startup when no key is configured.
    /// Tokens signed with it stop verifying after a restart.
    pub allow_ephemeral: bool,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            key_id: "key-1".to_string(),
            private_key_pem: None,
            public_key_pem: None,
            private_key_path: None,
            public_key_path: None,
            allow_ephemeral: false,
        }
    }
}

/// Browser session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the session cookie.
    pub cookie_name: String,

    /// Set the `Secure` attribute on the session cookie.
    pub secure_cookies: bool,

    /// Idle lifetime of a session.
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "studio_session".to_string(),
            secure_cookies: true,
            lifetime: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// User-facing page locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    /// Login page.
    pub login_path: String,
    /// Consent page.
    pub consent_path: String,
    /// Landing page after a login without a pending authorization request.
    pub dashboard_path: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            consent_path: "/authorize".to_string(),
            dashboard_path: "/dashboard".to_string(),
        }
    }
}

/// Provider token encryption configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// Password the AES-256-GCM key is derived from.
    pub password: String,
}

/// GitHub OAuth application used to log users in.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GithubConfig {
    /// OAuth application client id.
    pub client_id: String,
    /// OAuth application client secret.
    pub client_secret: String,
    /// Scopes requested from GitHub.
    pub scope: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            scope: "repo user:email".to_string(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}
