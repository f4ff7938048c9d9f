//! PKCE (Proof Key for Code Exchange), RFC 7636.
//!
//! The engine supports both `S256` and `plain`. The authorization endpoint
//! only accepts `S256`; `plain` exists so stored codes can be verified
//! whatever method they were issued with.
//!
//! # Example
//!
//! ```
//! use studio_auth::oauth::pkce::{derive_challenge, generate_verifier, verify_challenge, PkceChallengeMethod};
//!
//! let verifier = generate_verifier();
//! let challenge = derive_challenge(&verifier, PkceChallengeMethod::S256);
//!
//! assert!(verify_challenge(&verifier, &challenge, PkceChallengeMethod::S256));
//! assert!(!verify_challenge("some-other-verifier", &challenge, PkceChallengeMethod::S256));
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::secret::constant_time_eq;

/// Random bytes in a generated verifier (43 base64url characters).
const VERIFIER_BYTES: usize = 32;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE operations.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// `code_challenge` is absent from the authorization request.
    #[error("code_challenge is required")]
    MissingChallenge,

    /// Unknown challenge method, or one not accepted at this point.
    #[error("Unsupported code_challenge_method: {0}")]
    UnsupportedMethod(String),
}

impl PkceError {
    /// Create an `UnsupportedMethod` error.
    #[must_use]
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod(method.into())
    }
}

// =============================================================================
// PKCE Challenge Method
// =============================================================================

/// PKCE challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PkceChallengeMethod {
    /// `BASE64URL(SHA256(verifier))`.
    #[default]
    S256,
    /// The challenge is the verifier itself.
    #[serde(rename = "plain")]
    Plain,
}

impl PkceChallengeMethod {
    /// Parse challenge method from string.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything other than `S256`
    /// or `plain`.
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(PkceError::unsupported_method(other)),
        }
    }

    /// Get the method as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Generates a verifier from 32 OS-random bytes, base64url encoded.
#[must_use]
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Derives the challenge a client sends for `verifier`.
#[must_use]
pub fn derive_challenge(verifier: &str, method: PkceChallengeMethod) -> String {
    match method {
        PkceChallengeMethod::S256 => URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())),
        PkceChallengeMethod::Plain => verifier.to_string(),
    }
}

/// Recomputes the challenge for `verifier` and compares it with
/// `stored_challenge` in constant time.
#[must_use]
pub fn verify_challenge(verifier: &str, stored_challenge: &str, method: PkceChallengeMethod) -> bool {
    let computed = derive_challenge(verifier, method);
    constant_time_eq(computed.as_bytes(), stored_challenge.as_bytes())
}

/// Checks the PKCE parameters of an authorization request.
///
/// The challenge must be present and the method (defaulting to `S256`) must
/// be `S256`.
///
/// # Errors
///
/// Returns `PkceError::MissingChallenge` or `PkceError::UnsupportedMethod`.
pub fn require_s256(
    code_challenge: Option<&str>,
    code_challenge_method: Option<&str>,
) -> Result<(String, PkceChallengeMethod), PkceError> {
    let challenge = code_challenge
        .filter(|c| !c.is_empty())
        .ok_or(PkceError::MissingChallenge)?;

    match code_challenge_method.unwrap_or("S256") {
        "S256" => Ok((challenge.to_string(), PkceChallengeMethod::S256)),
        other => Err(PkceError::unsupported_method(other)),
    }
}

// =============================================================================
// Tests
// =============================================================================
