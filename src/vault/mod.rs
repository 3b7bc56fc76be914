//! Credential vault: authenticated decryption of stored database passwords.
//!
//! Stored credentials are base64 encoded `nonce || sealed-data` produced by
//! AES-GCM. Decryption either yields the exact plaintext or fails; a short
//! input, a bad key length or a tag mismatch never produces output.

pub mod cipher;
pub mod key;
pub mod legacy;
pub mod secret;

pub use cipher::{NONCE_SIZE, decrypt, encrypt};
pub use key::{KEY_ENV, KeyError, KeySource, VaultKey};
pub use secret::Secret;

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;
use zeroize::Zeroize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("invalid key length {0}, expected 16, 24 or 32 bytes")]
    InvalidKeyLength(usize),

    #[error("ciphertext is {0} bytes, shorter than the {nonce} byte nonce", nonce = NONCE_SIZE)]
    Truncated(usize),

    #[error("authentication failed, the ciphertext was altered or the key is wrong")]
    Authentication,

    #[error("ciphertext is not valid base64: {0}")]
    Encoding(String),

    #[error("decrypted secret is not valid UTF-8")]
    NotUtf8,

    #[error("encryption failed")]
    Encryption,
}

/// Decrypt a base64 encoded credential into a [`Secret`].
///
/// An empty string means no credential is stored and yields an empty secret
/// without touching the cipher.
///
/// # Errors
///
/// Returns [`VaultError`] if decoding, authentication or UTF-8 validation fails
pub fn decrypt_secret(encoded: &str, key: &VaultKey) -> Result<Secret, VaultError> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Ok(Secret::default());
    }

    let ciphertext = STANDARD
        .decode(encoded)
        .map_err(|e| VaultError::Encoding(e.to_string()))?;
    let mut plaintext = decrypt(&ciphertext, key.as_bytes())?;

    into_secret(std::mem::take(&mut *plaintext))
}

/// Move plaintext bytes into a [`Secret`], wiping them if they are not UTF-8
fn into_secret(bytes: Vec<u8>) -> Result<Secret, VaultError> {
    String::from_utf8(bytes).map(Secret::new).map_err(|err| {
        err.into_bytes().zeroize();
        VaultError::NotUtf8
    })
}

/// Encrypt a plaintext credential into the base64 form stored in configuration
///
/// # Errors
///
/// Returns [`VaultError`] if encryption fails
pub fn encrypt_secret(plaintext: &str, key: &VaultKey) -> Result<String, VaultError> {
    encrypt(plaintext.as_bytes(), key.as_bytes()).map(|sealed| STANDARD.encode(sealed))
}
