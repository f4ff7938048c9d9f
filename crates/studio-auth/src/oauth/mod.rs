//! OAuth 2.1 authorization server implementation.
//!
//! # Authorization Code Flow
//!
//! - [`authorize`] - Request/response types for the authorization endpoint
//! - [`session`] - Browser session context and the pending request
//! - [`redirect`] - Redirect URI validation against registered origins
//! - [`pkce`] - PKCE challenge/verifier engine
//! - [`code`] - Single-use authorization codes
//!
//! # Token Endpoint
//!
//! - [`client_auth`] / [`credentials`] - Client authentication
//! - [`token`] - Request/response types for the token and revocation endpoints
//! - [`refresh`] - Refresh token lifecycle
//!
//! [`service::OAuthService`] composes all of the above into endpoint logic.
//!
//! # Example
//!
//! ```ignore
//! use studio_auth::oauth::{OAuthService, AuthorizeOutcome};
//!
//! let outcome = service.authorize(&request, &mut session).await?;
//! let location = outcome.redirect_path(&service.config().ui);
//! ```

pub mod authorize;
pub mod client_auth;
pub mod code;
pub mod credentials;
pub mod discovery;
pub mod pkce;
pub mod redirect;
pub mod refresh;
pub mod registration;
pub mod service;
pub mod session;
pub mod token;
pub mod userinfo;

// Authorization endpoint types
pub use authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
    ConsentDecision, ConsentResponse,
};

// Client authentication
pub use client_auth::{
    ClientCredentials, TokenEndpointAuthMethod, authenticate_client, parse_basic_auth,
};
pub use credentials::CredentialStore;

// Grant artifacts
pub use code::{AuthorizationCodeService, ConsumedCode};
pub use refresh::{RefreshGrant, RefreshTokenService};

// PKCE
pub use pkce::{PkceChallengeMethod, PkceError};

// Redirect validation
pub use redirect::{STUDIO_CALLBACK_PATH, WebsiteUrlError, build_callback_url, validate_redirect_uri};

// Registration
pub use registration::{ClientRegistration, RegisteredClient, RegistrationError};

// Orchestration
pub use discovery::DiscoveryDocument;
pub use service::{AuthorizeOutcome, LoginOutcome, OAuthService};
pub use session::{PendingOAuthRequest, SessionData, SessionUser};

// Token endpoint types
pub use token::{GrantType, RevocationRequest, TokenRequest, TokenResponse, TokenTypeHint};
pub use userinfo::UserInfo;
