//! AES-256-GCM secret box for Redis server passwords.
//!
//! Passwords are stored as base64 `nonce || ciphertext || tag` and only
//! decrypted when a connection to the server is opened. The 32-byte key is
//! derived from the configured passphrase with SHA-256.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Nonce size for AES-256-GCM (12 bytes).
const NONCE_SIZE: usize = 12;
/// AES-256 key size (32 bytes).
const KEY_SIZE: usize = 32;
/// GCM tag size (16 bytes).
const TAG_SIZE: usize = 16;

/// Secret box failures. Messages never include plaintext.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("key init failed: {0}")]
    Key(String),

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed")]
    Decrypt,

    #[error("malformed ciphertext: {0}")]
    Malformed(String),
}

fn derive_key(passphrase: &str) -> [u8; KEY_SIZE] {
    let digest = Sha256::digest(passphrase.as_bytes());
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&digest);
    key
}

fn cipher(passphrase: &str) -> Result<Aes256Gcm, SecretError> {
    Aes256Gcm::new_from_slice(&derive_key(passphrase)).map_err(|e| SecretError::Key(e.to_string()))
}

/// Encrypt `plaintext`, returning base64 `nonce || ciphertext || tag`.
pub fn seal(plaintext: &str, passphrase: &str) -> Result<String, SecretError> {
    let cipher = cipher(passphrase)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| SecretError::Encrypt)?;

    let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(&combined))
}

/// Decrypt a value produced by [`seal`].
pub fn open(sealed: &str, passphrase: &str) -> Result<String, SecretError> {
    let combined = STANDARD
        .decode(sealed)
        .map_err(|e| SecretError::Malformed(e.to_string()))?;

    if combined.len() < NONCE_SIZE + TAG_SIZE {
        return Err(SecretError::Malformed("ciphertext too short".into()));
    }

    let cipher = cipher(passphrase)?;
    let (nonce, ciphertext) = combined.split_at(NONCE_SIZE);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| SecretError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|e| SecretError::Malformed(e.to_string()))
}
