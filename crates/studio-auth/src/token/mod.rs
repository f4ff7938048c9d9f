//! Token signing, verification and minting.
//!
//! This module provides:
//!
//! - RS256 JWT encoding and decoding with a single active keypair
//! - JWKS export
//! - Access token and ID token minting from user records

pub mod jwt;
pub mod service;

pub use jwt::{
    AccessTokenClaims, AccessTokenClaimsBuilder, IdTokenClaims, Jwk, Jwks, JwtError, JwtService,
    SigningKeyPair, TokenProfile, VerifyOptions,
};
pub use service::{TokenConfig, TokenService};
