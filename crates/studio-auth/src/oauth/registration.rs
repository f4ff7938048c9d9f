//! Building client registrations.
//!
//! Registration validates the website URL and preview pattern, assigns an
//! identifier and a secret, and stores only the secret's digest. The
//! plaintext secret is handed back once in [`RegisteredClient`].

use time::OffsetDateTime;
use uuid::Uuid;

use crate::oauth::redirect::{WebsiteUrlError, validate_preview_pattern, validate_website_url};
use crate::secret::{CLIENT_SECRET_BYTES, generate_secure_token, hash_token};
use crate::types::OAuthClient;

/// Input for a new client registration.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistration {
    /// Fixed client id; a UUID v4 is generated when `None`.
    pub id: Option<String>,
    /// Fixed client secret; a random one is generated when `None`.
    pub secret: Option<String>,
    /// Display name.
    pub name: String,
    /// Client origin.
    pub website_url: String,
    /// Optional preview deployment pattern.
    pub preview_url_pattern: Option<String>,
    /// Registering user.
    pub owner_id: Option<Uuid>,
}

/// A registration ready to be stored, plus the plaintext secret.
#[derive(Debug, Clone)]
pub struct RegisteredClient {
    /// The client record (secret hashed).
    pub client: OAuthClient,
    /// The plaintext secret. Never stored.
    pub client_secret: String,
}

/// Reasons a registration is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// Name is empty.
    #[error("Client name is required")]
    MissingName,

    /// Website URL rejected.
    #[error(transparent)]
    WebsiteUrl(#[from] WebsiteUrlError),

    /// Preview pattern rejected.
    #[error("Invalid preview URL pattern: {0}")]
    PreviewPattern(WebsiteUrlError),
}

impl ClientRegistration {
    /// Validates the registration and builds the client record.
    ///
    /// # Errors
    ///
    /// Returns a `RegistrationError` describing the first invalid field.
    pub fn build(self) -> Result<RegisteredClient, RegistrationError> {
        if self.name.trim().is_empty() {
            return Err(RegistrationError::MissingName);
        }

        let website_url = validate_website_url(&self.website_url)?;
        let preview_url_pattern = self
            .preview_url_pattern
            .filter(|p| !p.trim().is_empty())
            .map(|p| validate_preview_pattern(&p))
            .transpose()
            .map_err(RegistrationError::PreviewPattern)?;

        let client_secret = self
            .secret
            .unwrap_or_else(|| generate_secure_token(CLIENT_SECRET_BYTES));

        let client = OAuthClient {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            secret_hash: hash_token(&client_secret),
            name: self.name,
            website_url,
            preview_url_pattern,
            is_active: true,
            owner_id: self.owner_id,
            created_at: OffsetDateTime::now_utc(),
        };

        Ok(RegisteredClient {
            client,
            client_secret,
        })
    }
}
