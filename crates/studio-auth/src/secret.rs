//! Random secret generation, hashing and constant-time comparison.
//!
//! Authorization codes, refresh tokens and client secrets are all opaque hex
//! strings drawn from the operating system RNG. Refresh tokens and client
//! secrets are persisted only as their SHA-256 digest.
//!
//! # Example
//!
//! ```
//! use studio_auth::secret::{generate_secure_token, hash_token, verify_token_hash};
//!
//! let secret = generate_secure_token(32);
//! assert_eq!(secret.len(), 64);
//!
//! let stored = hash_token(&secret);
//! assert!(verify_token_hash(&secret, &stored));
//! assert!(!verify_token_hash("something-else", &stored));
//! ```

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Random bytes in an authorization code.
pub const AUTHORIZATION_CODE_BYTES: usize = 32;

/// Random bytes in a refresh token.
pub const REFRESH_TOKEN_BYTES: usize = 64;

/// Random bytes in a client secret.
pub const CLIENT_SECRET_BYTES: usize = 32;

/// Generates `bytes` random bytes and returns them hex encoded.
///
/// The returned string is `2 * bytes` characters long.
#[must_use]
pub fn generate_secure_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Returns the lowercase hex SHA-256 digest of `token`.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Compares two byte strings in constant time.
///
/// Returns `false` immediately when the lengths differ. Callers compare
/// fixed-size digests, so the length check reveals nothing about a secret.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Hashes `presented` and compares it against `stored_hash` in constant time.
#[must_use]
pub fn verify_token_hash(presented: &str, stored_hash: &str) -> bool {
    let presented_hash = hash_token(presented);
    constant_time_eq(presented_hash.as_bytes(), stored_hash.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secure_token_length() {
        assert_eq!(generate_secure_token(AUTHORIZATION_CODE_BYTES).len(), 64);
        assert_eq!(generate_secure_token(REFRESH_TOKEN_BYTES).len(), 128);
    }

    #[test]
    fn test_generate_secure_token_is_hex() {
        let token = generate_secure_token(16);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_secure_token_unique() {
        let a = generate_secure_token(32);
        let b = generate_secure_token(32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_token_known_vector() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_token_hash() {
        let token = generate_secure_token(32);
        let stored = hash_token(&token);
        assert!(verify_token_hash(&token, &stored));

        let mut tampered = token.clone();
        tampered.replace_range(0..1, if token.starts_with('0') { "1" } else { "0" });
        assert!(!verify_token_hash(&tampered, &stored));
    }

    #[test]
    fn test_constant_time_eq_length_mismatch() {
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
        assert!(constant_time_eq(b"abcd", b"abcd"));
    }
}
