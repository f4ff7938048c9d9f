//! OpenID Connect discovery and JWKS endpoints.

use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use super::state::AuthState;

const PUBLIC_CACHE: &str = "public, max-age=3600";

/// `GET /.well-known/openid-configuration`
pub async fn discovery_handler(State(state): State<AuthState>) -> Response {
    (
        [(header::CACHE_CONTROL, PUBLIC_CACHE)],
        Json(state.service.discovery()),
    )
        .into_response()
}

/// `GET /.well-known/jwks.json`
pub async fn jwks_handler(State(state): State<AuthState>) -> Response {
    (
        [(header::CACHE_CONTROL, PUBLIC_CACHE)],
        Json(state.service.jwks()),
    )
        .into_response()
}
