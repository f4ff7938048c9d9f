//! Provider token encryption using AES-256-GCM.
//!
//! The key is derived from a configured password with PBKDF2-HMAC-SHA256.
//! Each encryption uses a fresh 96-bit nonce; the output is
//! `base64(nonce || ciphertext)` so a single string column holds everything
//! needed to decrypt.

use std::num::NonZeroU32;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use rand::rngs::OsRng;
use ring::pbkdf2;

/// Nonce size for AES-256-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// Key size for AES-256 (256 bits)
const KEY_SIZE: usize = 32;

const PBKDF2_SALT: &[u8] = b"nuxt-studio-auth-token-encryption";

const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Errors produced while encrypting a provider token.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// The cipher could not be constructed from the derived key.
    #[error("Failed to create cipher: {0}")]
    Key(String),

    /// AEAD encryption failed.
    #[error("Encryption failed: {0}")]
    Encrypt(String),
}

/// Symmetric protection of provider access tokens at rest.
pub trait ProviderTokenCipher: Send + Sync {
    /// Encrypts `plaintext` into a storable string.
    ///
    /// # Errors
    ///
    /// Returns `CipherError` if encryption fails.
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;

    /// Decrypts a value produced by [`encrypt`](Self::encrypt).
    ///
    /// Returns `None` for anything that does not decrypt: wrong key,
    /// tampered data, truncated input or invalid base64.
    fn decrypt(&self, encrypted: &str) -> Option<String>;
}

/// AES-256-GCM cipher keyed from a password.
#[derive(Clone)]
pub struct AesGcmTokenCipher {
    key: [u8; KEY_SIZE],
}

impl AesGcmTokenCipher {
    /// Derives the key from `password`.
    #[must_use]
    pub fn new(password: &str) -> Self {
        let mut key = [0u8; KEY_SIZE];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            PBKDF2_ITERATIONS,
            PBKDF2_SALT,
            password.as_bytes(),
            &mut key,
        );
        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Gcm, CipherError> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|e| CipherError::Key(e.to_string()))
    }
}

impl std::fmt::Debug for AesGcmTokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmTokenCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl ProviderTokenCipher for AesGcmTokenCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CipherError::Encrypt(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(combined))
    }

    fn decrypt(&self, encrypted: &str) -> Option<String> {
        let combined = match BASE64.decode(encrypted) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Provider token is not valid base64");
                return None;
            }
        };

        if combined.len() <= NONCE_SIZE {
            tracing::warn!("Provider token ciphertext is truncated");
            return None;
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let cipher = self.cipher().ok()?;

        let plaintext = match cipher.decrypt(Nonce::from_slice(nonce_bytes), ciphertext) {
            Ok(plaintext) => plaintext,
            Err(_) => {
                tracing::warn!("Failed to decrypt provider token");
                return None;
            }
        };

        String::from_utf8(plaintext).ok()
    }
}
