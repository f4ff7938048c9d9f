//! Authentication and authorization error types.
//!
//! This module defines the error type shared by every component of the
//! authorization server. HTTP rendering lives in [`crate::http::error`].

use std::fmt;

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The client credentials are invalid or the client is not registered.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The authorization code or refresh token is invalid, expired, or revoked.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The access token is missing, malformed, or failed verification.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The request lacks an authenticated end-user session.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthorized.
        message: String,
    },

    /// The authenticated user does not have permission to perform the action.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// The request is missing a parameter or is otherwise malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The resource owner denied the authorization request.
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Description of why access was denied.
        message: String,
    },

    /// The authorization server does not support the requested response type.
    #[error("Unsupported response type: {response_type}")]
    UnsupportedResponseType {
        /// The unsupported response type.
        response_type: String,
    },

    /// The authorization server does not support the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },

    /// The external identity provider returned an error.
    #[error("Identity provider error: {provider} - {message}")]
    IdentityProvider {
        /// The identity provider name.
        provider: String,
        /// Description of the error.
        message: String,
    },

    /// Provider token encryption failed.
    #[error("Encryption error: {message}")]
    Encryption {
        /// Description of the encryption error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedResponseType` error.
    #[must_use]
    pub fn unsupported_response_type(response_type: impl Into<String>) -> Self {
        Self::UnsupportedResponseType {
            response_type: response_type.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a new `IdentityProvider` error.
    #[must_use]
    pub fn identity_provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IdentityProvider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Encryption` error.
    #[must_use]
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidClient { .. }
                | Self::InvalidGrant { .. }
                | Self::InvalidToken { .. }
                | Self::Unauthorized { .. }
                | Self::Forbidden { .. }
                | Self::InvalidRequest { .. }
                | Self::AccessDenied { .. }
                | Self::UnsupportedResponseType { .. }
                | Self::UnsupportedGrantType { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns `true` if this is an authentication error (answered with 401).
    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidClient { .. } | Self::InvalidToken { .. } | Self::Unauthorized { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidClient { .. } => ErrorCategory::Authentication,
            Self::InvalidToken { .. } => ErrorCategory::Authentication,
            Self::Unauthorized { .. } => ErrorCategory::Authentication,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::AccessDenied { .. } => ErrorCategory::Authorization,
            Self::InvalidGrant { .. } => ErrorCategory::State,
            Self::InvalidRequest { .. } => ErrorCategory::Protocol,
            Self::UnsupportedResponseType { .. } => ErrorCategory::Protocol,
            Self::UnsupportedGrantType { .. } => ErrorCategory::Protocol,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
            Self::Encryption { .. } => ErrorCategory::Internal,
            Self::IdentityProvider { .. } => ErrorCategory::Federation,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::InvalidToken { .. } => "invalid_token",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "access_denied",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::AccessDenied { .. } => "access_denied",
            Self::UnsupportedResponseType { .. } => "unsupported_response_type",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. }
            | Self::IdentityProvider { .. }
            | Self::Encryption { .. } => "server_error",
        }
    }

    /// Returns the text suitable for an `error_description` field.
    ///
    /// Server-side failures are reported generically so storage or
    /// configuration details never reach the client.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::InvalidClient { message }
            | Self::InvalidGrant { message }
            | Self::InvalidToken { message }
            | Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::InvalidRequest { message }
            | Self::AccessDenied { message } => message.clone(),
            Self::UnsupportedResponseType { .. } => {
                "Unsupported response_type. Only \"code\" is supported.".to_string()
            }
            Self::UnsupportedGrantType { .. } => {
                "Only authorization_code and refresh_token grant types are supported".to_string()
            }
            Self::IdentityProvider { .. } => "Identity provider request failed".to_string(),
            Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. }
            | Self::Encryption { .. } => "Internal server error".to_string(),
        }
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or unsupported protocol parameters.
    Protocol,
    /// Client or token authentication failures.
    Authentication,
    /// Permission failures.
    Authorization,
    /// Consumed codes, revoked tokens, missing pending requests.
    State,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
    /// Identity provider errors.
    Federation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol => write!(f, "protocol"),
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::State => write!(f, "state"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
            Self::Federation => write!(f, "federation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_client("client not found");
        assert_eq!(err.to_string(), "Invalid client: client not found");

        let err = AuthError::invalid_grant("expired authorization code");
        assert_eq!(err.to_string(), "Invalid grant: expired authorization code");

        let err = AuthError::unsupported_grant_type("password");
        assert_eq!(err.to_string(), "Unsupported grant type: password");
    }

    #[test]
    fn test_oauth_error_codes() {
        assert_eq!(
            AuthError::invalid_client("x").oauth_error_code(),
            "invalid_client"
        );
        assert_eq!(
            AuthError::invalid_token("x").oauth_error_code(),
            "invalid_token"
        );
        assert_eq!(
            AuthError::unsupported_response_type("token").oauth_error_code(),
            "unsupported_response_type"
        );
        assert_eq!(AuthError::storage("db down").oauth_error_code(), "server_error");
    }

    #[test]
    fn test_description_hides_server_details() {
        let err = AuthError::storage("connection refused to 10.0.0.3:5432");
        assert_eq!(err.description(), "Internal server error");

        let err = AuthError::invalid_request("Missing required parameter: state");
        assert_eq!(err.description(), "Missing required parameter: state");

        let err = AuthError::unsupported_grant_type("password");
        assert_eq!(
            err.description(),
            "Only authorization_code and refresh_token grant types are supported"
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            AuthError::invalid_request("x").category(),
            ErrorCategory::Protocol
        );
        assert_eq!(
            AuthError::invalid_grant("x").category(),
            ErrorCategory::State
        );
        assert_eq!(
            AuthError::forbidden("x").category(),
            ErrorCategory::Authorization
        );
        assert_eq!(ErrorCategory::Federation.to_string(), "federation");
    }

    #[test]
    fn test_client_vs_server_errors() {
        assert!(AuthError::invalid_client("x").is_client_error());
        assert!(AuthError::invalid_client("x").is_authentication_error());
        assert!(!AuthError::invalid_request("x").is_authentication_error());
        assert!(AuthError::internal("x").is_server_error());
        assert!(AuthError::identity_provider("github", "timeout").is_server_error());
    }
}
