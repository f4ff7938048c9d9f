//! OpenID Connect UserInfo endpoint.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use super::error::OAuthErrorBody;
use super::extract::bearer_token;
use super::state::AuthState;

/// `GET /oauth/userinfo`
///
/// Claims are read from the current user record. A request without a
/// Bearer token gets a bare `WWW-Authenticate: Bearer` challenge (RFC 6750
/// §3.1); a rejected token gets `error="invalid_token"`.
pub async fn userinfo_handler(State(state): State<AuthState>, headers: HeaderMap) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return missing_token();
    };

    match state.service.userinfo(token).await {
        Ok(info) => Json(info).into_response(),
        Err(e) => e.into_response(),
    }
}

fn missing_token() -> Response {
    let body = OAuthErrorBody {
        error: "invalid_token".to_string(),
        error_description: "Missing or invalid access token".to_string(),
    };
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
        Json(body),
    )
        .into_response()
}
