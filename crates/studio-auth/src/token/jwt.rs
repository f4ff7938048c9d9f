//! JWT signing, verification and JWKS export.
//!
//! Access tokens and ID tokens are RS256 JWTs signed with the single active
//! keypair. The header always carries the configured key id, which is also the
//! `kid` published in the JWKS.
//!
//! Verification never tells the caller *why* a token was rejected: malformed
//! input, a bad signature, an expired `exp`, a wrong `iss` or a wrong `aud` all
//! surface as [`JwtError::InvalidToken`]. The underlying reason is logged at
//! debug level only.
//!
//! ## Example
//!
//! ```ignore
//! use studio_auth::token::jwt::{JwtService, SigningKeyPair, VerifyOptions};
//!
//! let key_pair = SigningKeyPair::generate_rsa("key-1")?;
//! let jwt_service = JwtService::new(key_pair, "https://auth.example.com");
//!
//! let token = jwt_service.sign(&claims)?;
//! let claims: AccessTokenClaims = jwt_service.verify(&token, &VerifyOptions::issuer("https://auth.example.com"))?;
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Signing algorithm used for every token this server issues.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// JOSE name of [`SIGNING_ALGORITHM`].
pub const SIGNING_ALGORITHM_NAME: &str = "RS256";

/// RSA modulus size for generated keys.
const RSA_KEY_BITS: usize = 2048;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// The token failed verification. The reason is intentionally not exposed.
    #[error("Invalid token")]
    InvalidToken,

    /// Failed to generate a cryptographic key.
    #[error("Key generation error: {message}")]
    KeyGenerationError {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGenerationError`.
    #[must_use]
    pub fn key_generation_error(message: impl Into<String>) -> Self {
        Self::KeyGenerationError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

}

// ============================================================================
// Claims
// ============================================================================

/// Claims of an access token.
///
/// `aud` is the client id the token was issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user id).
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Audience (client id).
    pub aud: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Granted scopes (space-separated).
    pub scope: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl AccessTokenClaims {
    /// Starts building access token claims.
    #[must_use]
    pub fn builder(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        client_id: impl Into<String>,
    ) -> AccessTokenClaimsBuilder {
        AccessTokenClaimsBuilder::new(issuer.into(), subject.into(), client_id.into())
    }
}

/// Builder for [`AccessTokenClaims`].
#[derive(Debug)]
pub struct AccessTokenClaimsBuilder {
    iss: String,
    sub: String,
    aud: String,
    scope: String,
    name: String,
    email: String,
    picture: Option<String>,
    issued_at: OffsetDateTime,
    expires_in_seconds: i64,
}

impl AccessTokenClaimsBuilder {
    fn new(iss: String, sub: String, aud: String) -> Self {
        Self {
            iss,
            sub,
            aud,
            scope: String::new(),
            name: String::new(),
            email: String::new(),
            picture: None,
            issued_at: OffsetDateTime::now_utc(),
            expires_in_seconds: 3600,
        }
    }

    /// Sets the granted scope.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the profile claims.
    #[must_use]
    pub fn profile(mut self, profile: &TokenProfile) -> Self {
        self.name = profile.name.clone();
        self.email = profile.email.clone();
        self.picture = profile.picture.clone();
        self
    }

    /// Overrides the issued-at instant.
    #[must_use]
    pub fn issued_at(mut self, issued_at: OffsetDateTime) -> Self {
        self.issued_at = issued_at;
        self
    }

    /// Sets the lifetime relative to the issued-at instant.
    #[must_use]
    pub fn expires_in_seconds(mut self, seconds: i64) -> Self {
        self.expires_in_seconds = seconds;
        self
    }

    /// Builds the claims.
    #[must_use]
    pub fn build(self) -> AccessTokenClaims {
        let iat = self.issued_at.unix_timestamp();
        AccessTokenClaims {
            sub: self.sub,
            iss: self.iss,
            aud: self.aud,
            exp: iat + self.expires_in_seconds,
            iat,
            scope: self.scope,
            name: self.name,
            email: self.email,
            picture: self.picture,
        }
    }
}

/// Claims of an OpenID Connect ID token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject (user id).
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Audience (client id).
    pub aud: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Nonce from the authorization request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Profile values copied into tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenProfile {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Avatar URL.
    pub picture: Option<String>,
}

/// Expectations applied on top of signature and expiry checks.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Required `iss` value.
    pub issuer: Option<String>,
    /// Value that must be contained in `aud` (a string or an array).
    pub audience: Option<String>,
}

impl VerifyOptions {
    /// Options requiring only an issuer match.
    #[must_use]
    pub fn issuer(issuer: impl Into<String>) -> Self {
        Self {
            issuer: Some(issuer.into()),
            audience: None,
        }
    }

    /// Adds a required audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

// ============================================================================
// JWKS
// ============================================================================

/// JSON Web Key Set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in the set.
    pub keys: Vec<Jwk>,
}

/// RSA JSON Web Key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always "RSA".
    pub kty: String,
    /// Modulus (base64url, no padding).
    pub n: String,
    /// Public exponent (base64url, no padding).
    pub e: String,
    /// Algorithm, always "RS256".
    pub alg: String,
    /// Intended use, always "sig".
    #[serde(rename = "use")]
    pub use_: String,
    /// Key identifier.
    pub kid: String,
}

// ============================================================================
// Signing Key Pair
// ============================================================================

/// The active RS256 signing keypair.
pub struct SigningKeyPair {
    /// Key identifier placed in token headers.
    pub kid: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    n: Vec<u8>,
    e: Vec<u8>,
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl SigningKeyPair {
    /// An HMAC key under an RSA kid; every signing attempt fails.
    #[cfg(test)]
    pub(crate) fn unusable(kid: impl Into<String>) -> Self {
        Self {
            kid: kid.into(),
            encoding_key: EncodingKey::from_secret(b"not-an-rsa-key"),
            decoding_key: DecodingKey::from_secret(b"not-an-rsa-key"),
            n: Vec::new(),
            e: Vec::new(),
        }
    }

    /// Generates a new 2048-bit RSA keypair.
    ///
    /// # Errors
    /// Returns an error if key generation or PEM encoding fails.
    pub fn generate_rsa(kid: impl Into<String>) -> Result<Self, JwtError> {
        let private_key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let public_key = private_key.to_public_key();

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        Self::from_pem(kid, private_pem.as_str(), &public_pem)
    }

    /// Loads a keypair from a PKCS#8 private key PEM and an SPKI public key PEM.
    ///
    /// # Errors
    /// Returns an error if either PEM cannot be parsed as an RSA key.
    pub fn from_pem(
        kid: impl Into<String>,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<Self, JwtError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        let public_key = RsaPublicKey::from_public_key_pem(public_pem)
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        Ok(Self {
            kid: kid.into(),
            encoding_key,
            decoding_key,
            n: public_key.n().to_bytes_be(),
            e: public_key.e().to_bytes_be(),
        })
    }

    /// Exports the public half as a JWK.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            n: URL_SAFE_NO_PAD.encode(&self.n),
            e: URL_SAFE_NO_PAD.encode(&self.e),
            alg: SIGNING_ALGORITHM_NAME.to_string(),
            use_: "sig".to_string(),
            kid: self.kid.clone(),
        }
    }
}

// ============================================================================
// JWT Service
// ============================================================================

/// Signs and verifies tokens with the active keypair.
///
/// This service is `Send + Sync` and is shared behind an `Arc`.
#[derive(Debug)]
pub struct JwtService {
    signing_key: SigningKeyPair,
    issuer: String,
}

impl JwtService {
    /// Creates a new JWT service.
    #[must_use]
    pub fn new(signing_key: SigningKeyPair, issuer: impl Into<String>) -> Self {
        Self {
            signing_key,
            issuer: issuer.into(),
        }
    }

    /// Signs `claims` into a compact JWT.
    ///
    /// # Errors
    /// Returns an error if serialization or signing fails.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let mut header = Header::new(SIGNING_ALGORITHM);
        header.kid = Some(self.signing_key.kid.clone());

        encode(&header, claims, &self.signing_key.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Verifies a compact JWT and returns its claims.
    ///
    /// Rejects tokens that do not have exactly three segments, whose signature
    /// does not match, whose `exp` is in the past (no leeway), or whose
    /// `iss`/`aud` do not match `options`.
    ///
    /// # Errors
    /// Returns [`JwtError::InvalidToken`] for every failure.
    pub fn verify<T: DeserializeOwned>(
        &self,
        token: &str,
        options: &VerifyOptions,
    ) -> Result<T, JwtError> {
        if token.split('.').count() != 3 {
            tracing::debug!("Rejected token: malformed segment count");
            return Err(JwtError::InvalidToken);
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        if let Some(issuer) = &options.issuer {
            validation.set_issuer(&[issuer]);
        }

        match &options.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        decode::<T>(token, &self.signing_key.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(reason = ?e.kind(), "Rejected token");
                JwtError::InvalidToken
            })
    }

    /// Returns the signing key ID.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.signing_key.kid
    }

    /// Returns the issuer URL.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the JWKS containing the public key.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        Jwks {
            keys: vec![self.signing_key.to_jwk()],
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
