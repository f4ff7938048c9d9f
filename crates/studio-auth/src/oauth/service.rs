//! Protocol orchestration.
//!
//! [`OAuthService`] implements the logic behind every endpoint by composing
//! the credential store, the code and refresh token services, the token
//! service and the provider token cipher. It knows nothing about HTTP: the
//! caller hands in parsed parameters and the browser's [`SessionData`], and
//! persists the session afterwards.
//!
//! # Authorization flow
//!
//! ```text
//! authorize ──(no session user)──▶ pending login ──complete_login──┐
//!     │                                                            ▼
//!     └──────(session user)──────────────────────────────▶ pending consent
//!                                                                  │
//!                                             decide ──▶ code issued | denied
//! ```

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::config::{AuthConfig, UiConfig};
use crate::error::AuthError;
use crate::identity::{ExternalIdentity, ProviderTokenCipher};
use crate::oauth::authorize::{
    AuthorizationError, AuthorizationRequest, AuthorizationResponse, ConsentDecision,
    ConsentResponse,
};
use crate::oauth::client_auth::{ClientCredentials, authenticate_client};
use crate::oauth::code::AuthorizationCodeService;
use crate::oauth::credentials::CredentialStore;
use crate::oauth::discovery::DiscoveryDocument;
use crate::oauth::pkce::{PkceError, require_s256};
use crate::oauth::refresh::RefreshTokenService;
use crate::oauth::session::{PendingOAuthRequest, SessionData, SessionUser};
use crate::oauth::token::{
    GrantType, RevocationRequest, TokenRequest, TokenResponse, TokenTypeHint, has_openid_scope,
};
use crate::oauth::userinfo::UserInfo;
use crate::storage::{AuthStores, UserStorage};
use crate::token::{Jwks, JwtService, TokenConfig, TokenService};
use crate::types::{OAuthClient, User};

const MISSING_AUTHORIZE_PARAMS: &str =
    "Missing required parameters: client_id, redirect_uri, response_type, state";
const MISSING_CODE_CHALLENGE: &str =
    "Missing required parameter: code_challenge. PKCE is required.";
const UNSUPPORTED_CHALLENGE_METHOD: &str =
    "Unsupported code_challenge_method. Only \"S256\" is supported.";
const INVALID_REFRESH_TOKEN: &str = "Invalid or expired refresh token";

/// Where the browser goes after a successful `GET /oauth/authorize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizeOutcome {
    /// No user in the session: log in first.
    Login,
    /// User known: show the consent page.
    Consent,
}

impl AuthorizeOutcome {
    /// The page to redirect to.
    #[must_use]
    pub fn redirect_path<'a>(&self, ui: &'a UiConfig) -> &'a str {
        match self {
            Self::Login => &ui.login_path,
            Self::Consent => &ui.consent_path,
        }
    }
}

/// Where the browser goes after an identity provider login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The provider released no email address; nobody was logged in.
    MissingEmail,
    /// Logged in with an authorization request pending.
    Consent,
    /// Logged in without a pending request.
    Dashboard,
}

impl LoginOutcome {
    /// The page to redirect to.
    #[must_use]
    pub fn redirect_path(&self, ui: &UiConfig) -> String {
        match self {
            Self::MissingEmail => format!("{}?error=github_no_email", ui.login_path),
            Self::Consent => ui.consent_path.clone(),
            Self::Dashboard => ui.dashboard_path.clone(),
        }
    }
}

/// The authorization server's endpoint logic.
#[derive(Clone)]
pub struct OAuthService {
    config: Arc<AuthConfig>,
    credentials: CredentialStore,
    codes: AuthorizationCodeService,
    refresh_tokens: RefreshTokenService,
    tokens: TokenService,
    users: Arc<dyn UserStorage>,
    cipher: Arc<dyn ProviderTokenCipher>,
}

impl OAuthService {
    /// Wires the service from configuration, stores, the signing service and
    /// the provider token cipher.
    #[must_use]
    pub fn new(
        config: AuthConfig,
        stores: AuthStores,
        jwt_service: Arc<JwtService>,
        cipher: Arc<dyn ProviderTokenCipher>,
    ) -> Self {
        let token_config = TokenConfig::new(config.issuer())
            .with_access_token_lifetime(config.oauth.access_token_lifetime);

        Self {
            credentials: CredentialStore::new(stores.clients),
            codes: AuthorizationCodeService::new(
                stores.codes,
                stores.users.clone(),
                config.oauth.authorization_code_lifetime,
            ),
            refresh_tokens: RefreshTokenService::new(
                stores.refresh_tokens,
                config.oauth.refresh_token_lifetime,
            ),
            tokens: TokenService::new(jwt_service, token_config),
            users: stores.users,
            cipher,
            config: Arc::new(config),
        }
    }

    /// Returns the configuration the service was built with.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Returns the OpenID Connect discovery document.
    #[must_use]
    pub fn discovery(&self) -> DiscoveryDocument {
        DiscoveryDocument::build(&self.config)
    }

    /// Returns the public signing key set.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        self.tokens.jwks()
    }

    /// Validates an authorization request and parks it in the session.
    ///
    /// The granted scope is always the configured default scope.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for missing parameters, missing PKCE, a method
    ///   other than `S256`, an unknown client or a redirect URI the client
    ///   does not own
    /// - `UnsupportedResponseType` when `response_type` is not `code`
    pub async fn authorize(
        &self,
        request: &AuthorizationRequest,
        session: &mut SessionData,
    ) -> AuthResult<AuthorizeOutcome> {
        let (Some(client_id), Some(redirect_uri), Some(response_type), Some(state)) = (
            non_empty(&request.client_id),
            non_empty(&request.redirect_uri),
            non_empty(&request.response_type),
            non_empty(&request.state),
        ) else {
            return Err(AuthError::invalid_request(MISSING_AUTHORIZE_PARAMS));
        };

        let (code_challenge, code_challenge_method) = require_s256(
            non_empty(&request.code_challenge),
            non_empty(&request.code_challenge_method),
        )
        .map_err(|e| match e {
            PkceError::MissingChallenge => AuthError::invalid_request(MISSING_CODE_CHALLENGE),
            PkceError::UnsupportedMethod(_) => {
                AuthError::invalid_request(UNSUPPORTED_CHALLENGE_METHOD)
            }
        })?;

        if response_type != "code" {
            return Err(AuthError::unsupported_response_type(response_type));
        }

        let client = self
            .credentials
            .get_client(client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_request("Invalid client_id"))?;

        if !client.accepts_redirect_uri(redirect_uri) {
            tracing::warn!(
                client_id = %client_id,
                redirect_uri = %redirect_uri,
                "Rejected redirect_uri not owned by client"
            );
            return Err(AuthError::invalid_request(
                "Invalid redirect_uri for the specified client.",
            ));
        }

        let authenticated = session.is_authenticated();
        session.oauth_request = Some(PendingOAuthRequest {
            client_id: client.id.clone(),
            redirect_uri: redirect_uri.to_string(),
            scope: self.config.oauth.default_scope.clone(),
            state: state.to_string(),
            code_challenge,
            code_challenge_method,
            nonce: non_empty(&request.nonce).map(str::to_string),
            client_name: authenticated.then(|| client.name.clone()),
        });

        tracing::debug!(
            client_id = %client.id,
            authenticated,
            "Authorization request stored in session"
        );

        Ok(if authenticated {
            AuthorizeOutcome::Consent
        } else {
            AuthorizeOutcome::Login
        })
    }

    /// Applies the user's consent decision to the pending request.
    ///
    /// The pending request is removed from the session whatever the
    /// decision.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` without a session user
    /// - `InvalidRequest` without a pending request
    pub async fn decide(
        &self,
        decision: ConsentDecision,
        session: &mut SessionData,
    ) -> AuthResult<ConsentResponse> {
        let Some(user_id) = session.user.as_ref().map(|u| u.id) else {
            return Err(AuthError::unauthorized("Authentication required"));
        };
        let Some(pending) = session.oauth_request.take() else {
            return Err(AuthError::invalid_request("No OAuth request in session"));
        };

        let redirect_url = if decision.approved {
            let code = self.codes.issue(user_id, &pending).await?;
            tracing::info!(client_id = %pending.client_id, user_id = %user_id, "Authorization approved");
            AuthorizationResponse::new(code, pending.state).to_redirect_url(&pending.redirect_uri)
        } else {
            tracing::info!(client_id = %pending.client_id, user_id = %user_id, "Authorization denied");
            AuthorizationError::user_denied(pending.state).to_redirect_url(&pending.redirect_uri)
        };

        let redirect_url = redirect_url
            .map_err(|e| AuthError::internal(format!("Invalid stored redirect_uri: {e}")))?;
        Ok(ConsentResponse { redirect_url })
    }

    /// Token endpoint: authenticates the client and dispatches on
    /// `grant_type`.
    ///
    /// # Errors
    ///
    /// - `InvalidClient` when client authentication fails
    /// - `InvalidRequest` for missing grant parameters
    /// - `InvalidGrant` when the code or refresh token is rejected
    /// - `UnsupportedGrantType` for anything but `authorization_code` and
    ///   `refresh_token`
    pub async fn token(
        &self,
        credentials: Option<ClientCredentials>,
        request: TokenRequest,
    ) -> AuthResult<TokenResponse> {
        let client = authenticate_client(credentials, &self.credentials).await?;

        match request.grant_type.as_deref().and_then(GrantType::parse) {
            Some(GrantType::AuthorizationCode) => {
                self.exchange_authorization_code(&client, request).await
            }
            Some(GrantType::RefreshToken) => self.exchange_refresh_token(&client, request).await,
            None => {
                let grant_type = request.grant_type.unwrap_or_default();
                tracing::debug!(client_id = %client.id, grant_type = %grant_type, "Unsupported grant type");
                Err(AuthError::unsupported_grant_type(grant_type))
            }
        }
    }

    async fn exchange_authorization_code(
        &self,
        client: &OAuthClient,
        request: TokenRequest,
    ) -> AuthResult<TokenResponse> {
        let (Some(code), Some(redirect_uri)) =
            (non_empty(&request.code), non_empty(&request.redirect_uri))
        else {
            return Err(AuthError::invalid_request("Missing code or redirect_uri"));
        };

        let consumed = self
            .codes
            .consume(
                code,
                &client.id,
                redirect_uri,
                request.code_verifier.as_deref(),
            )
            .await?;

        // Refresh token last, so a signing failure leaves nothing stored
        let response = self.mint_tokens(
            &consumed.user,
            &client.id,
            &consumed.scope,
            consumed.nonce.as_deref(),
        )?;
        let refresh_token = self
            .refresh_tokens
            .issue(&client.id, consumed.user.id, &consumed.scope)
            .await?;
        let response = response.with_refresh_token(refresh_token);

        tracing::info!(
            client_id = %client.id,
            user_id = %consumed.user.id,
            grant_type = GrantType::AuthorizationCode.as_str(),
            "Issued tokens"
        );
        Ok(response)
    }

    async fn exchange_refresh_token(
        &self,
        client: &OAuthClient,
        request: TokenRequest,
    ) -> AuthResult<TokenResponse> {
        let Some(refresh_token) = non_empty(&request.refresh_token) else {
            return Err(AuthError::invalid_request("Missing refresh_token"));
        };

        let grant = self.refresh_tokens.exchange(refresh_token, &client.id).await?;

        let Some(user) = self.users.find_by_id(grant.user_id).await? else {
            tracing::warn!(user_id = %grant.user_id, "Refresh token bound to unknown user");
            return Err(AuthError::invalid_grant(INVALID_REFRESH_TOKEN));
        };

        let response = self.mint_tokens(&user, &client.id, &grant.scope, None)?;

        tracing::info!(
            client_id = %client.id,
            user_id = %user.id,
            grant_type = GrantType::RefreshToken.as_str(),
            "Issued tokens"
        );
        Ok(response)
    }

    fn mint_tokens(
        &self,
        user: &User,
        client_id: &str,
        scope: &str,
        nonce: Option<&str>,
    ) -> AuthResult<TokenResponse> {
        let access_token = self.tokens.mint_access_token(user, client_id, scope)?;
        let mut response =
            TokenResponse::new(access_token, self.tokens.config().expires_in(), scope.to_string());

        if has_openid_scope(scope) {
            response = response.with_id_token(self.tokens.mint_id_token(user, client_id, nonce)?);
        }

        Ok(response)
    }

    /// Revocation endpoint (RFC 7009).
    ///
    /// Only refresh tokens are revoked. Access tokens are stateless and
    /// simply expire. Unknown tokens, unknown hints and storage failures are
    /// not reported.
    ///
    /// # Errors
    ///
    /// - `InvalidClient` when client authentication fails
    /// - `InvalidRequest` when `token` is missing
    pub async fn revoke(
        &self,
        credentials: Option<ClientCredentials>,
        request: RevocationRequest,
    ) -> AuthResult<()> {
        let client = authenticate_client(credentials, &self.credentials).await?;

        let Some(token) = non_empty(&request.token) else {
            return Err(AuthError::invalid_request("Missing token parameter"));
        };

        let hint = match non_empty(&request.token_type_hint) {
            Some(hint) => TokenTypeHint::parse(hint),
            None => Some(TokenTypeHint::RefreshToken),
        };

        match hint {
            Some(TokenTypeHint::RefreshToken) => match self.refresh_tokens.revoke(token).await {
                Ok(revoked) => {
                    tracing::debug!(client_id = %client.id, revoked, "Processed refresh token revocation");
                }
                Err(e) => {
                    tracing::warn!(client_id = %client.id, error = %e, "Refresh token revocation failed");
                }
            },
            Some(TokenTypeHint::AccessToken) | None => {
                tracing::debug!(
                    client_id = %client.id,
                    hint = ?request.token_type_hint,
                    "Revocation request without effect"
                );
            }
        }

        Ok(())
    }

    /// Resolves the claims for a bearer access token.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token fails verification or its subject
    /// no longer exists.
    pub async fn userinfo(&self, access_token: &str) -> AuthResult<UserInfo> {
        let claims = self
            .tokens
            .verify_access_token(access_token)
            .map_err(|_| AuthError::invalid_token("Token is invalid or expired"))?;

        let user = match Uuid::parse_str(&claims.sub) {
            Ok(user_id) => self.users.find_by_id(user_id).await?,
            Err(_) => None,
        };
        let Some(user) = user else {
            tracing::debug!(sub = %claims.sub, "Access token subject not found");
            return Err(AuthError::invalid_token("User not found"));
        };

        let provider_token = user
            .provider_token
            .as_deref()
            .and_then(|encrypted| self.cipher.decrypt(encrypted));

        Ok(UserInfo::new(&user, provider_token))
    }

    /// Logs in the user returned by the identity provider.
    ///
    /// The user is matched by provider id or email. A new user is created
    /// otherwise; the first user ever stored becomes an administrator. A
    /// pending authorization request in the session survives the login.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider token cannot be encrypted or storage
    /// fails.
    pub async fn complete_login(
        &self,
        identity: ExternalIdentity,
        session: &mut SessionData,
    ) -> AuthResult<LoginOutcome> {
        session.login_state = None;

        let Some(email) = identity.email.filter(|e| !e.is_empty()) else {
            tracing::warn!(provider_id = %identity.provider_id, "Identity provider returned no email");
            return Ok(LoginOutcome::MissingEmail);
        };

        let provider_token = identity
            .provider_token
            .as_deref()
            .map(|token| self.cipher.encrypt(token))
            .transpose()
            .map_err(|e| AuthError::encryption(e.to_string()))?;

        let now = OffsetDateTime::now_utc();
        let user = match self
            .users
            .find_by_provider_id_or_email(&identity.provider_id, &email)
            .await?
        {
            Some(mut user) => {
                user.name = identity.name;
                user.avatar = identity.avatar;
                user.provider_id = Some(identity.provider_id);
                user.provider_token = provider_token;
                user.updated_at = now;
                self.users.update(&user).await?;
                tracing::debug!(user_id = %user.id, "Updated user on login");
                user
            }
            None => {
                let is_admin = self.users.count().await? == 0;
                let user = User {
                    id: Uuid::new_v4(),
                    email,
                    name: identity.name,
                    avatar: identity.avatar,
                    provider_id: Some(identity.provider_id),
                    provider_token,
                    is_admin,
                    created_at: now,
                    updated_at: now,
                };
                self.users.create(&user).await?;
                tracing::info!(user_id = %user.id, is_admin, "Created user");
                user
            }
        };

        session.user = Some(SessionUser::from(&user));

        Ok(if session.oauth_request.is_some() {
            LoginOutcome::Consent
        } else {
            LoginOutcome::Dashboard
        })
    }

    /// Deletes authorization codes that expired before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn sweep_expired_codes(&self, now: OffsetDateTime) -> AuthResult<u64> {
        self.codes.sweep_expired(now).await
    }

    /// Revokes every refresh token of `user_id`, optionally for one client.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn revoke_user_tokens(
        &self,
        user_id: Uuid,
        client_id: Option<&str>,
    ) -> AuthResult<u64> {
        self.refresh_tokens.revoke_all(user_id, client_id).await
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    use crate::identity::AesGcmTokenCipher;
    use crate::oauth::client_auth::TokenEndpointAuthMethod;
    use crate::oauth::pkce::{PkceChallengeMethod, derive_challenge, generate_verifier};
    use crate::oauth::registration::ClientRegistration;
    use crate::storage::{ClientStorage, InMemoryAuthStorage};
    use crate::token::SigningKeyPair;

    const WEBSITE: &str = "https://docs.example.com";
    const REDIRECT: &str = "https://docs.example.com/__nuxt_studio/auth/sso";
    const ISSUER: &str = "https://auth.example.com";

    fn jwt_service() -> Arc<JwtService> {
        static JWT: OnceLock<Arc<JwtService>> = OnceLock::new();
        JWT.get_or_init(|| {
            Arc::new(JwtService::new(
                SigningKeyPair::generate_rsa("key-1").unwrap(),
                ISSUER,
            ))
        })
        .clone()
    }

    struct Fixture {
        service: OAuthService,
        storage: Arc<InMemoryAuthStorage>,
        client_id: String,
        client_secret: String,
    }

    impl Fixture {
        fn credentials(&self) -> Option<ClientCredentials> {
            Some(ClientCredentials {
                client_id: self.client_id.clone(),
                client_secret: self.client_secret.clone(),
                method: TokenEndpointAuthMethod::ClientSecretPost,
            })
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(jwt_service()).await
    }

    async fn fixture_with(jwt: Arc<JwtService>) -> Fixture {
        let storage = Arc::new(InMemoryAuthStorage::new());
        let registered = ClientRegistration {
            name: "Docs".to_string(),
            website_url: WEBSITE.to_string(),
            ..Default::default()
        }
        .build()
        .unwrap();
        ClientStorage::create(storage.as_ref(), &registered.client)
            .await
            .unwrap();

        let config = AuthConfig {
            issuer: ISSUER.to_string(),
            ..Default::default()
        };
        let service = OAuthService::new(
            config,
            AuthStores::from_backend(storage.clone()),
            jwt,
            Arc::new(AesGcmTokenCipher::new("test-password")),
        );

        Fixture {
            service,
            storage,
            client_id: registered.client.id,
            client_secret: registered.client_secret,
        }
    }

    fn identity(provider_id: &str, email: Option<&str>) -> ExternalIdentity {
        ExternalIdentity {
            provider_id: provider_id.to_string(),
            email: email.map(str::to_string),
            name: "Ada".to_string(),
            avatar: None,
            provider_token: Some("gho_secret".to_string()),
        }
    }

    fn authorize_request(client_id: &str, challenge: &str) -> AuthorizationRequest {
        AuthorizationRequest {
            response_type: Some("code".to_string()),
            client_id: Some(client_id.to_string()),
            redirect_uri: Some(REDIRECT.to_string()),
            scope: Some("openid".to_string()),
            state: Some("xyz".to_string()),
            code_challenge: Some(challenge.to_string()),
            code_challenge_method: None,
            nonce: Some("n-0S6".to_string()),
        }
    }

    fn query_param(url: &str, name: &str) -> Option<String> {
        url::Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Runs authorize, login and consent; returns the code and verifier.
    async fn approved_code(f: &Fixture, session: &mut SessionData) -> (String, String) {
        let verifier = generate_verifier();
        let challenge = derive_challenge(&verifier, PkceChallengeMethod::S256);

        let outcome = f
            .service
            .authorize(&authorize_request(&f.client_id, &challenge), session)
            .await
            .unwrap();
        assert_eq!(outcome, AuthorizeOutcome::Login);

        let login = f
            .service
            .complete_login(identity("42", Some("ada@example.com")), session)
            .await
            .unwrap();
        assert_eq!(login, LoginOutcome::Consent);

        let response = f
            .service
            .decide(ConsentDecision { approved: true }, session)
            .await
            .unwrap();
        assert_eq!(query_param(&response.redirect_url, "state").as_deref(), Some("xyz"));
        let code = query_param(&response.redirect_url, "code").unwrap();
        (code, verifier)
    }

    fn code_request(code: &str, verifier: &str) -> TokenRequest {
        TokenRequest {
            grant_type: Some("authorization_code".to_string()),
            code: Some(code.to_string()),
            redirect_uri: Some(REDIRECT.to_string()),
            code_verifier: Some(verifier.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_authorize_validation_order() {
        let f = fixture().await;
        let mut session = SessionData::default();

        let err = f
            .service
            .authorize(&AuthorizationRequest::default(), &mut session)
            .await
            .unwrap_err();
        assert_eq!(err.description(), MISSING_AUTHORIZE_PARAMS);

        let mut request = authorize_request(&f.client_id, "challenge");
        request.code_challenge = None;
        let err = f.service.authorize(&request, &mut session).await.unwrap_err();
        assert_eq!(err.description(), MISSING_CODE_CHALLENGE);

        let mut request = authorize_request(&f.client_id, "challenge");
        request.code_challenge_method = Some("plain".to_string());
        let err = f.service.authorize(&request, &mut session).await.unwrap_err();
        assert_eq!(err.description(), UNSUPPORTED_CHALLENGE_METHOD);

        let mut request = authorize_request(&f.client_id, "challenge");
        request.response_type = Some("token".to_string());
        let err = f.service.authorize(&request, &mut session).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "unsupported_response_type");

        let request = authorize_request("unknown-client", "challenge");
        let err = f.service.authorize(&request, &mut session).await.unwrap_err();
        assert_eq!(err.description(), "Invalid client_id");

        let mut request = authorize_request(&f.client_id, "challenge");
        request.redirect_uri = Some("https://evil.com/__nuxt_studio/auth/sso".to_string());
        let err = f.service.authorize(&request, &mut session).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_request");

        assert!(session.oauth_request.is_none());
    }

    #[tokio::test]
    async fn test_authorize_uses_default_scope_and_client_name() {
        let f = fixture().await;
        let mut session = SessionData::default();
        f.service
            .complete_login(identity("42", Some("ada@example.com")), &mut session)
            .await
            .unwrap();

        let outcome = f
            .service
            .authorize(&authorize_request(&f.client_id, "challenge"), &mut session)
            .await
            .unwrap();
        assert_eq!(outcome, AuthorizeOutcome::Consent);

        let pending = session.oauth_request.unwrap();
        assert_eq!(pending.scope, "openid profile email git:github");
        assert_eq!(pending.client_name.as_deref(), Some("Docs"));
        assert_eq!(pending.nonce.as_deref(), Some("n-0S6"));
    }

    #[tokio::test]
    async fn test_full_code_exchange() {
        let f = fixture().await;
        let mut session = SessionData::default();
        let (code, verifier) = approved_code(&f, &mut session).await;
        assert!(session.oauth_request.is_none());

        let response = f
            .service
            .token(f.credentials(), code_request(&code, &verifier))
            .await
            .unwrap();
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 3600);
        assert!(response.refresh_token.is_some());
        assert!(response.id_token.is_some());

        let info = f.service.userinfo(&response.access_token).await.unwrap();
        assert_eq!(info.email, "ada@example.com");
        assert_eq!(info.github_token.as_deref(), Some("gho_secret"));
        assert_eq!(info.git_provider.as_deref(), Some("github"));
    }

    #[tokio::test]
    async fn test_code_is_single_use() {
        let f = fixture().await;
        let mut session = SessionData::default();
        let (code, verifier) = approved_code(&f, &mut session).await;

        f.service
            .token(f.credentials(), code_request(&code, &verifier))
            .await
            .unwrap();
        let err = f
            .service
            .token(f.credentials(), code_request(&code, &verifier))
            .await
            .unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_grant");
        assert_eq!(err.description(), "Invalid or expired authorization code");
    }

    #[tokio::test]
    async fn test_signing_failure_stores_no_refresh_token() {
        let jwt = Arc::new(JwtService::new(SigningKeyPair::unusable("broken"), ISSUER));
        let f = fixture_with(jwt).await;
        let mut session = SessionData::default();
        let (code, verifier) = approved_code(&f, &mut session).await;
        let user_id = session.user.as_ref().unwrap().id;

        let err = f
            .service
            .token(f.credentials(), code_request(&code, &verifier))
            .await
            .unwrap_err();
        assert!(err.is_server_error());

        assert_eq!(f.service.revoke_user_tokens(user_id, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_token_client_authentication() {
        let f = fixture().await;

        let err = f
            .service
            .token(None, TokenRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.description(), "Client credentials required");

        let wrong = Some(ClientCredentials {
            client_id: f.client_id.clone(),
            client_secret: "wrong".to_string(),
            method: TokenEndpointAuthMethod::ClientSecretBasic,
        });
        let err = f
            .service
            .token(wrong, TokenRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.description(), "Invalid client credentials");
    }

    #[tokio::test]
    async fn test_token_request_errors() {
        let f = fixture().await;

        let err = f
            .service
            .token(f.credentials(), TokenRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.oauth_error_code(), "unsupported_grant_type");

        let request = TokenRequest {
            grant_type: Some("authorization_code".to_string()),
            code: Some("abc".to_string()),
            ..Default::default()
        };
        let err = f.service.token(f.credentials(), request).await.unwrap_err();
        assert_eq!(err.description(), "Missing code or redirect_uri");

        let request = TokenRequest {
            grant_type: Some("refresh_token".to_string()),
            ..Default::default()
        };
        let err = f.service.token(f.credentials(), request).await.unwrap_err();
        assert_eq!(err.description(), "Missing refresh_token");
    }

    #[tokio::test]
    async fn test_refresh_and_revoke() {
        let f = fixture().await;
        let mut session = SessionData::default();
        let (code, verifier) = approved_code(&f, &mut session).await;
        let issued = f
            .service
            .token(f.credentials(), code_request(&code, &verifier))
            .await
            .unwrap();
        let refresh_token = issued.refresh_token.unwrap();

        let refresh = || TokenRequest {
            grant_type: Some("refresh_token".to_string()),
            refresh_token: Some(refresh_token.clone()),
            ..Default::default()
        };

        let refreshed = f.service.token(f.credentials(), refresh()).await.unwrap();
        assert!(refreshed.refresh_token.is_none());
        assert!(refreshed.id_token.is_some());

        let revoke = || RevocationRequest {
            token: Some(refresh_token.clone()),
            ..Default::default()
        };
        f.service.revoke(f.credentials(), revoke()).await.unwrap();
        f.service.revoke(f.credentials(), revoke()).await.unwrap();

        let err = f.service.token(f.credentials(), refresh()).await.unwrap_err();
        assert_eq!(err.description(), INVALID_REFRESH_TOKEN);
    }

    #[tokio::test]
    async fn test_revoke_access_token_hint_is_noop() {
        let f = fixture().await;
        let mut session = SessionData::default();
        let (code, verifier) = approved_code(&f, &mut session).await;
        let issued = f
            .service
            .token(f.credentials(), code_request(&code, &verifier))
            .await
            .unwrap();
        let refresh_token = issued.refresh_token.unwrap();

        let request = RevocationRequest {
            token: Some(refresh_token.clone()),
            token_type_hint: Some("access_token".to_string()),
            ..Default::default()
        };
        f.service.revoke(f.credentials(), request).await.unwrap();

        let refresh = TokenRequest {
            grant_type: Some("refresh_token".to_string()),
            refresh_token: Some(refresh_token),
            ..Default::default()
        };
        assert!(f.service.token(f.credentials(), refresh).await.is_ok());

        let err = f
            .service
            .revoke(f.credentials(), RevocationRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.description(), "Missing token parameter");
    }

    #[tokio::test]
    async fn test_decide_requires_user_and_pending_request() {
        let f = fixture().await;

        let mut session = SessionData::default();
        let err = f
            .service
            .decide(ConsentDecision { approved: true }, &mut session)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized { .. }));

        f.service
            .complete_login(identity("42", Some("ada@example.com")), &mut session)
            .await
            .unwrap();
        let err = f
            .service
            .decide(ConsentDecision { approved: true }, &mut session)
            .await
            .unwrap_err();
        assert_eq!(err.description(), "No OAuth request in session");
    }

    #[tokio::test]
    async fn test_denial_clears_pending_request() {
        let f = fixture().await;
        let mut session = SessionData::default();
        f.service
            .authorize(&authorize_request(&f.client_id, "challenge"), &mut session)
            .await
            .unwrap();
        f.service
            .complete_login(identity("42", Some("ada@example.com")), &mut session)
            .await
            .unwrap();

        let response = f
            .service
            .decide(ConsentDecision { approved: false }, &mut session)
            .await
            .unwrap();
        assert_eq!(
            query_param(&response.redirect_url, "error").as_deref(),
            Some("access_denied")
        );
        assert_eq!(query_param(&response.redirect_url, "state").as_deref(), Some("xyz"));
        assert!(query_param(&response.redirect_url, "code").is_none());
        assert!(session.oauth_request.is_none());
    }

    #[tokio::test]
    async fn test_first_user_becomes_admin() {
        let f = fixture().await;

        let mut first = SessionData::default();
        f.service
            .complete_login(identity("1", Some("first@example.com")), &mut first)
            .await
            .unwrap();
        let mut second = SessionData::default();
        let outcome = f
            .service
            .complete_login(identity("2", Some("second@example.com")), &mut second)
            .await
            .unwrap();

        assert_eq!(outcome, LoginOutcome::Dashboard);
        assert!(first.user.unwrap().is_admin);
        assert!(!second.user.unwrap().is_admin);
    }

    #[tokio::test]
    async fn test_login_matches_existing_user_and_encrypts_token() {
        let f = fixture().await;
        let mut session = SessionData::default();
        f.service
            .complete_login(identity("42", Some("ada@example.com")), &mut session)
            .await
            .unwrap();
        let first_id = session.user.as_ref().unwrap().id;

        let mut again = SessionData::default();
        let mut renamed = identity("42", Some("ada@example.com"));
        renamed.name = "Ada L.".to_string();
        f.service.complete_login(renamed, &mut again).await.unwrap();

        let user = UserStorage::find_by_id(f.storage.as_ref(), first_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.user.unwrap().id, first_id);
        assert_eq!(user.name, "Ada L.");
        let stored = user.provider_token.unwrap();
        assert_ne!(stored, "gho_secret");
        assert_eq!(UserStorage::count(f.storage.as_ref()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_login_without_email() {
        let f = fixture().await;
        let mut session = SessionData {
            login_state: Some("s".to_string()),
            ..Default::default()
        };
        let outcome = f
            .service
            .complete_login(identity("42", None), &mut session)
            .await
            .unwrap();

        assert_eq!(outcome, LoginOutcome::MissingEmail);
        assert!(session.user.is_none());
        assert!(session.login_state.is_none());
        assert_eq!(
            outcome.redirect_path(&f.service.config().ui),
            "/login?error=github_no_email"
        );
    }

    #[tokio::test]
    async fn test_userinfo_rejects_foreign_tokens() {
        let f = fixture().await;
        let err = f.service.userinfo("not.a.jwt").await.unwrap_err();
        assert_eq!(err.description(), "Token is invalid or expired");
    }
}
