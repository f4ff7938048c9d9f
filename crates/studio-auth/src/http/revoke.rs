//! Token revocation endpoint (RFC 7009).
//!
//! Only refresh tokens are stored, so only refresh tokens can be revoked.
//! Access tokens are short-lived JWTs and expire on their own.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;
use crate::oauth::{ClientCredentials, RevocationRequest};

use super::extract::{FormOrJson, authorization_header};
use super::state::AuthState;

/// `POST /oauth/revoke`
///
/// Answers `200 {}` for every authenticated request with a `token`, whether
/// or not the token existed.
///
/// # Errors
///
/// - `InvalidClient` when client authentication fails
/// - `InvalidRequest` when `token` is missing
pub async fn revoke_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    FormOrJson(request): FormOrJson<RevocationRequest>,
) -> Result<Response, AuthError> {
    let credentials = ClientCredentials::extract(
        authorization_header(&headers),
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    );

    state.service.revoke(credentials, request).await?;
    Ok(Json(json!({})).into_response())
}
