//! Browser login through the identity provider.
//!
//! ```text
//! GET /auth/github                    → state stored in session, 302 to GitHub
//! GET /auth/github?code=...&state=... → user logged in, 302 to consent or dashboard
//! ```
//!
//! Every failure ends on the login page with an `error` query parameter so
//! the UI can explain what happened.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::error::AuthError;
use crate::oauth::LoginOutcome;
use crate::secret::{constant_time_eq, generate_secure_token};

use super::found;
use super::session::BrowserSession;
use super::state::AuthState;

/// Path of the login route, also the callback registered with GitHub.
pub const GITHUB_LOGIN_PATH: &str = "/auth/github";

const LOGIN_STATE_BYTES: usize = 16;

/// Error code appended to the login page when the login fails.
pub const LOGIN_FAILED_ERROR: &str = "github_auth_failed";

/// Callback parameters sent by the provider.
#[derive(Debug, Default, Deserialize)]
pub struct LoginCallback {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// `GET /auth/github`
///
/// # Errors
///
/// Returns an error only when the session store fails; provider failures
/// redirect to the login page.
pub async fn github_login_handler(
    State(state): State<AuthState>,
    jar: CookieJar,
    Query(callback): Query<LoginCallback>,
) -> Result<Response, AuthError> {
    let config = state.service.config();
    let mut session =
        BrowserSession::load(&jar, state.sessions.as_ref(), &config.session).await?;
    let failure = format!("{}?error={LOGIN_FAILED_ERROR}", config.ui.login_path);

    if let Some(error) = callback.error.as_deref() {
        tracing::info!(
            provider = state.identity_provider.name(),
            error = %error,
            "Identity provider reported a login error"
        );
        session.data.login_state = None;
        let jar = session
            .save(jar, state.sessions.as_ref(), &config.session)
            .await?;
        return Ok((jar, found(&failure)).into_response());
    }

    let Some(code) = callback.code.filter(|c| !c.is_empty()) else {
        let login_state = generate_secure_token(LOGIN_STATE_BYTES);
        let location = state.identity_provider.authorization_url(&login_state);
        session.data.login_state = Some(login_state);

        let jar = session
            .save(jar, state.sessions.as_ref(), &config.session)
            .await?;
        return Ok((jar, found(&location)).into_response());
    };

    let expected = session.data.login_state.take();
    let state_matches = match (expected.as_deref(), callback.state.as_deref()) {
        (Some(expected), Some(presented)) => {
            constant_time_eq(expected.as_bytes(), presented.as_bytes())
        }
        _ => false,
    };

    let location = if !state_matches {
        tracing::warn!(
            provider = state.identity_provider.name(),
            "Login callback state mismatch"
        );
        failure
    } else {
        match state.identity_provider.exchange(&code).await {
            Ok(identity) => {
                match state.service.complete_login(identity, &mut session.data).await {
                    Ok(outcome @ (LoginOutcome::Consent | LoginOutcome::Dashboard)) => {
                        session.regenerate(state.sessions.as_ref()).await?;
                        outcome.redirect_path(&config.ui)
                    }
                    Ok(outcome) => outcome.redirect_path(&config.ui),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to complete login");
                        failure
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    provider = state.identity_provider.name(),
                    error = %e,
                    "Identity provider exchange failed"
                );
                failure
            }
        }
    };

    let jar = session
        .save(jar, state.sessions.as_ref(), &config.session)
        .await?;
    Ok((jar, found(&location)).into_response())
}
