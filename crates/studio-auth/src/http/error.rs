//! Error response handling for the OAuth endpoints.
//!
//! Every [`AuthError`] renders as an RFC 6749 error object:
//!
//! ```json
//! { "error": "invalid_grant", "error_description": "Invalid or expired authorization code" }
//! ```
//!
//! 401 responses carry a `WWW-Authenticate` header (RFC 6750).

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// OAuth error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthErrorBody {
    /// RFC 6749 error code.
    pub error: String,
    /// Human-readable description.
    pub error_description: String,
}

impl AuthError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidClient { .. } | Self::InvalidToken { .. } | Self::Unauthorized { .. } => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden { .. } | Self::AccessDenied { .. } => StatusCode::FORBIDDEN,
            Self::InvalidGrant { .. }
            | Self::InvalidRequest { .. }
            | Self::UnsupportedResponseType { .. }
            | Self::UnsupportedGrantType { .. } => StatusCode::BAD_REQUEST,
            Self::IdentityProvider { .. } => StatusCode::BAD_GATEWAY,
            Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. }
            | Self::Encryption { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_server_error() {
            tracing::error!(category = %self.category(), error = %self, "Request failed");
        } else {
            tracing::debug!(category = %self.category(), error = %self, "Request rejected");
        }

        let body = OAuthErrorBody {
            error: self.oauth_error_code().to_string(),
            error_description: self.description(),
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            let challenge = format!("Bearer error=\"{}\"", self.oauth_error_code());
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}
