//! Opaque token codec.
//!
//! AES-256-GCM with a random 96-bit nonce per ciphertext. The wire form is
//! `base64url(nonce || ciphertext || tag)`. Used for offer ids and page cursors;
//! clients can neither read nor forge them.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

/// AES-GCM standard nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// Key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token key must be {KEY_LEN} bytes")]
    InvalidKey,

    #[error("entropy source unavailable")]
    Entropy,

    #[error("token is not valid base64")]
    Encoding,

    #[error("token is shorter than its nonce")]
    NonceLength,

    #[error("token failed authentication")]
    Authentication,

    #[error("token plaintext is not valid UTF-8")]
    Utf8,
}

/// Symmetric AEAD codec over an internal 256-bit key
#[derive(Clone)]
pub struct TokenCodec {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenCodec(..)")
    }
}

impl TokenCodec {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Build from the standard-alphabet base64 key held in configuration
    pub fn from_base64_key(encoded: &str) -> Result<Self, TokenError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| TokenError::InvalidKey)?;
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| TokenError::InvalidKey)?;
        Ok(Self::new(&key))
    }

    /// Codec with a fresh random key
    pub fn generate() -> Result<Self, TokenError> {
        let mut key = [0u8; KEY_LEN];
        OsRng.try_fill_bytes(&mut key).map_err(|_| TokenError::Entropy)?;
        Ok(Self::new(&key))
    }

    pub fn encode(&self, plaintext: &[u8]) -> Result<String, TokenError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|_| TokenError::Entropy)?;

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| TokenError::Authentication)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(URL_SAFE.encode(out))
    }

    pub fn decode(&self, token: &str) -> Result<Vec<u8>, TokenError> {
        let raw = URL_SAFE.decode(token).map_err(|_| TokenError::Encoding)?;
        if raw.len() < NONCE_LEN {
            return Err(TokenError::NonceLength);
        }
        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| TokenError::Authentication)
    }

    pub fn encode_str(&self, plaintext: &str) -> Result<String, TokenError> {
        self.encode(plaintext.as_bytes())
    }

    pub fn decode_str(&self, token: &str) -> Result<String, TokenError> {
        String::from_utf8(self.decode(token)?).map_err(|_| TokenError::Utf8)
    }
}
