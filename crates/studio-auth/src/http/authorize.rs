//! Authorization endpoint handlers.
//!
//! # Flow
//!
//! ```text
//! GET /oauth/authorize?client_id=...&redirect_uri=...&code_challenge=...
//!     ├─► Invalid request → 400 OAuth error (no redirect)
//!     ├─► No session user → request stored, 302 to the login page
//!     └─► Session user    → request stored, 302 to the consent page
//!
//! POST /oauth/authorize {"approved": bool}
//!     ├─► No session user    → 401
//!     ├─► No pending request → 400
//!     └─► {"redirectUrl": "<redirect_uri>?code=...&state=..."}
//!         or {"redirectUrl": "<redirect_uri>?error=access_denied&..."}
//! ```

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;

use crate::error::AuthError;
use crate::oauth::{AuthorizationRequest, ConsentDecision};

use super::found;
use super::session::BrowserSession;
use super::state::AuthState;

/// `GET /oauth/authorize`
///
/// # Errors
///
/// Returns the OAuth error of a rejected request; nothing is stored in the
/// session in that case.
pub async fn authorize_handler(
    State(state): State<AuthState>,
    jar: CookieJar,
    query: Result<Query<AuthorizationRequest>, QueryRejection>,
) -> Result<Response, AuthError> {
    let Query(request) = query.map_err(|e| {
        tracing::debug!(error = %e, "Rejected authorization query");
        AuthError::invalid_request("Missing required parameters")
    })?;

    let config = state.service.config();
    let mut session =
        BrowserSession::load(&jar, state.sessions.as_ref(), &config.session).await?;

    let outcome = state.service.authorize(&request, &mut session.data).await?;
    let location = outcome.redirect_path(&config.ui).to_string();

    let jar = session
        .save(jar, state.sessions.as_ref(), &config.session)
        .await?;
    Ok((jar, found(&location)).into_response())
}

/// `POST /oauth/authorize`
///
/// # Errors
///
/// - `Unauthorized` without a logged-in session
/// - `InvalidRequest` without a pending authorization request
pub async fn consent_handler(
    State(state): State<AuthState>,
    jar: CookieJar,
    body: Result<Json<ConsentDecision>, JsonRejection>,
) -> Result<Response, AuthError> {
    let Json(decision) = body.map_err(|e| {
        tracing::debug!(error = %e, "Rejected consent body");
        AuthError::invalid_request("Invalid request body")
    })?;

    let config = state.service.config();
    let mut session =
        BrowserSession::load(&jar, state.sessions.as_ref(), &config.session).await?;
    let before = session.data.clone();

    let result = state.service.decide(decision, &mut session.data).await;

    // The pending request is gone even when issuing the code failed.
    let jar = if session.data == before {
        jar
    } else {
        session
            .save(jar, state.sessions.as_ref(), &config.session)
            .await?
    };

    let response = result?;
    Ok((jar, Json(response)).into_response())
}
