//! Request extraction helpers.

use axum::{
    Form, Json,
    extract::{FromRequest, Request},
    http::{HeaderMap, header},
};
use serde::de::DeserializeOwned;

use crate::error::AuthError;

/// Body parsed as JSON when the request says so, as a URL-encoded form
/// otherwise.
///
/// Studio sends JSON; standard OAuth clients send forms.
#[derive(Debug, Clone)]
pub struct FormOrJson<T>(pub T);

impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_json(req.headers()) {
            let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
                tracing::debug!(error = %e, "Rejected JSON body");
                AuthError::invalid_request("Invalid request body")
            })?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state).await.map_err(|e| {
                tracing::debug!(error = %e, "Rejected form body");
                AuthError::invalid_request("Invalid request body")
            })?;
            Ok(Self(value))
        }
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
}

/// Returns the raw `Authorization` header value.
#[must_use]
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Returns the token of an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    authorization_header(headers)
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
