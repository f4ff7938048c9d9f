//! OAuth 2.0 Token endpoint handler.
//!
//! Supports the `authorization_code` and `refresh_token` grants.
//!
//! # Example
//!
//! ```ignore
//! POST /oauth/token
//! Content-Type: application/x-www-form-urlencoded
//! Authorization: Basic <base64(client_id:client_secret)>
//!
//! grant_type=authorization_code
//! &code=8f2c...
//! &redirect_uri=https://docs.example.com/__nuxt_studio/auth/sso
//! &code_verifier=dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk
//! ```

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};

use crate::error::AuthError;
use crate::oauth::{ClientCredentials, TokenRequest};

use super::extract::{FormOrJson, authorization_header};
use super::state::AuthState;

/// `POST /oauth/token`
///
/// Client credentials come from an `Authorization: Basic` header or the
/// `client_id`/`client_secret` body parameters. Successful and failed
/// responses both carry `Cache-Control: no-store`.
pub async fn token_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    body: Result<FormOrJson<TokenRequest>, AuthError>,
) -> Response {
    let FormOrJson(request) = match body {
        Ok(body) => body,
        Err(e) => {
            let mut response = e.into_response();
            no_store(&mut response);
            return response;
        }
    };
    let credentials = ClientCredentials::extract(
        authorization_header(&headers),
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    );
    let grant_type = request.grant_type.clone();

    let mut response = match state.service.token(credentials, request).await {
        Ok(tokens) => {
            tracing::debug!(grant_type = ?grant_type, "Token request succeeded");
            Json(tokens).into_response()
        }
        Err(e) => {
            tracing::debug!(grant_type = ?grant_type, error = %e, "Token request failed");
            e.into_response()
        }
    };

    no_store(&mut response);
    response
}

fn no_store(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
}

