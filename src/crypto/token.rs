//! Sealed delivery tokens built on AES-256-GCM.
//!
//! A token is `base64(nonce || ciphertext || tag)` using the standard
//! alphabet with padding. The 12-byte nonce is drawn from the OS random
//! source for every call and travels in the clear in front of the sealed
//! body; the GCM tag covers the ciphertext under that nonce, so any edit to
//! any byte of the token is rejected on open.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use super::integrity::{derive_key, DerivedKey};

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Failure kinds for token handling. The messages are fixed strings so that
/// nothing about the key, the plaintext or the point of failure leaks to a
/// client that receives them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    MalformedToken,
    #[error("token failed authentication")]
    Authentication,
    #[error("token encryption failed: {0}")]
    Encryption(String),
}

/// Seals and opens tokens under one long-lived key.
///
/// Holds no mutable state; share it behind an `Arc` and call it from any
/// number of tasks at once.
#[derive(Clone)]
pub struct TokenCodec {
    cipher: Aes256Gcm,
}

impl TokenCodec {
    pub fn new(key: &DerivedKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.as_bytes().into()),
        }
    }

    /// Convenience for startup code: derive the key and build the codec.
    pub fn from_secret(secret: &str) -> Self {
        Self::new(&derive_key(secret))
    }

    /// Encrypts `plaintext` under a fresh random nonce and returns the
    /// transport-safe token.
    pub fn encode(&self, plaintext: &[u8]) -> Result<String, TokenError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| TokenError::Encryption(format!("random source unavailable: {e}")))?;

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| TokenError::Encryption(format!("{e}")))?;

        let mut framed = Vec::with_capacity(NONCE_LEN + sealed.len());
        framed.extend_from_slice(&nonce);
        framed.extend_from_slice(&sealed);
        Ok(STANDARD.encode(framed))
    }

    /// Verifies and decrypts a token. Nothing is returned unless the tag
    /// checks out.
    pub fn decode(&self, token: &str) -> Result<Vec<u8>, TokenError> {
        let raw = STANDARD
            .decode(token.as_bytes())
            .map_err(|_| TokenError::MalformedToken)?;
        if raw.len() < NONCE_LEN {
            return Err(TokenError::MalformedToken);
        }

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| TokenError::Authentication)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenCodec(<redacted>)")
    }
}
