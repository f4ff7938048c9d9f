//! GitHub login.
//!
//! Implements the browser leg of GitHub's OAuth web flow: build the
//! authorize URL, exchange the callback code for a GitHub access token, then
//! read the profile. When the profile carries no public email the primary
//! verified address from `/user/emails` is used.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use url::Url;

use crate::AuthResult;
use crate::config::GithubConfig;
use crate::error::AuthError;
use crate::identity::provider::{ExternalIdentity, IdentityProvider};

const PROVIDER: &str = "github";

const DEFAULT_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const DEFAULT_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const DEFAULT_API_BASE: &str = "https://api.github.com";

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const CLIENT_USER_AGENT: &str = concat!("studio-auth/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct GithubTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// GitHub as the login provider.
#[derive(Debug, Clone)]
pub struct GithubIdentityProvider {
    http_client: Client,
    client_id: String,
    client_secret: String,
    scope: String,
    redirect_uri: String,
    authorize_url: String,
    token_url: String,
    api_base: String,
}

impl GithubIdentityProvider {
    /// Creates a provider for the configured GitHub OAuth application.
    ///
    /// `redirect_uri` is this server's login callback, registered with the
    /// GitHub application.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the client id is empty or the
    /// HTTP client cannot be built.
    pub fn new(config: &GithubConfig, redirect_uri: impl Into<String>) -> AuthResult<Self> {
        if config.client_id.is_empty() {
            return Err(AuthError::configuration("github.client_id is not set"));
        }

        let http_client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthError::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
            redirect_uri: redirect_uri.into(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Points the provider at different GitHub endpoints (GitHub Enterprise).
    #[must_use]
    pub fn with_endpoints(
        mut self,
        authorize_url: impl Into<String>,
        token_url: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        self.authorize_url = authorize_url.into();
        self.token_url = token_url.into();
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn exchange_code(&self, code: &str) -> AuthResult<String> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(provider_error)?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, "GitHub token exchange failed");
            return Err(AuthError::identity_provider(
                PROVIDER,
                format!("token endpoint returned {status}"),
            ));
        }

        let body: GithubTokenResponse = response.json().await.map_err(provider_error)?;

        // GitHub reports a bad code with a 200 and an error body.
        if let Some(error) = body.error {
            tracing::warn!(
                error = %error,
                description = ?body.error_description,
                "GitHub rejected the authorization code"
            );
            return Err(AuthError::identity_provider(PROVIDER, error));
        }

        body.access_token
            .ok_or_else(|| AuthError::identity_provider(PROVIDER, "no access_token in response"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> AuthResult<T> {
        let response = self
            .http_client
            .get(format!("{}{}", self.api_base, path))
            .bearer_auth(access_token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .map_err(provider_error)?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, path = %path, "GitHub API request failed");
            return Err(AuthError::identity_provider(
                PROVIDER,
                format!("{path} returned {status}"),
            ));
        }

        response.json().await.map_err(provider_error)
    }

    async fn primary_email(&self, access_token: &str) -> AuthResult<Option<String>> {
        let emails: Vec<GithubEmail> = self.get_json("/user/emails", access_token).await?;
        Ok(select_primary_email(emails))
    }
}

fn provider_error(e: reqwest::Error) -> AuthError {
    tracing::error!(error = %e, "GitHub request failed");
    AuthError::identity_provider(PROVIDER, e.to_string())
}

fn select_primary_email(emails: Vec<GithubEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email)
}

#[async_trait]
impl IdentityProvider for GithubIdentityProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn authorization_url(&self, state: &str) -> String {
        match Url::parse(&self.authorize_url) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("client_id", &self.client_id)
                    .append_pair("redirect_uri", &self.redirect_uri)
                    .append_pair("scope", &self.scope)
                    .append_pair("state", state);
                url.to_string()
            }
            Err(e) => {
                tracing::error!(error = %e, url = %self.authorize_url, "Invalid GitHub authorize URL");
                self.authorize_url.clone()
            }
        }
    }

    async fn exchange(&self, code: &str) -> AuthResult<ExternalIdentity> {
        let access_token = self.exchange_code(code).await?;
        let user: GithubUser = self.get_json("/user", &access_token).await?;

        let email = match user.email.filter(|e| !e.is_empty()) {
            Some(email) => Some(email),
            None => self.primary_email(&access_token).await?,
        };

        tracing::info!(github_id = user.id, login = %user.login, "GitHub login succeeded");

        Ok(ExternalIdentity {
            provider_id: user.id.to_string(),
            email,
            name: user
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| user.login.clone()),
            avatar: user.avatar_url,
            provider_token: Some(access_token),
        })
    }
}
