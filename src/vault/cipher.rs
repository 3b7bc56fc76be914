use super::VaultError;
use aes_gcm::{
    Aes128Gcm, Aes256Gcm, AesGcm, KeyInit, Nonce,
    aead::{Aead, consts::U12},
    aes::Aes192,
};
use rand::RngCore;
use zeroize::Zeroizing;

/// AES-GCM standard nonce length in bytes
pub const NONCE_SIZE: usize = 12;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// AES-GCM instance selected by key length (16, 24 or 32 bytes)
enum Cipher {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

impl Cipher {
    fn new(key: &[u8]) -> Result<Self, VaultError> {
        let invalid = |_| VaultError::InvalidKeyLength(key.len());
        match key.len() {
            16 => Aes128Gcm::new_from_slice(key).map(Self::Aes128).map_err(invalid),
            24 => Aes192Gcm::new_from_slice(key).map(Self::Aes192).map_err(invalid),
            32 => Aes256Gcm::new_from_slice(key).map(Self::Aes256).map_err(invalid),
            other => Err(VaultError::InvalidKeyLength(other)),
        }
    }

    fn open(&self, nonce: &[u8], sealed: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        let nonce = Nonce::<U12>::from_slice(nonce);
        match self {
            Self::Aes128(c) => c.decrypt(nonce, sealed),
            Self::Aes192(c) => c.decrypt(nonce, sealed),
            Self::Aes256(c) => c.decrypt(nonce, sealed),
        }
    }

    fn seal(&self, nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        let nonce = Nonce::<U12>::from_slice(nonce);
        match self {
            Self::Aes128(c) => c.encrypt(nonce, plaintext),
            Self::Aes192(c) => c.encrypt(nonce, plaintext),
            Self::Aes256(c) => c.encrypt(nonce, plaintext),
        }
    }
}

/// Key lengths accepted by the cipher
#[must_use]
pub const fn is_valid_key_length(len: usize) -> bool {
    matches!(len, 16 | 24 | 32)
}

/// Decrypt `nonce || sealed` with the given key.
///
/// Fails without returning any plaintext when the input is shorter than the
/// nonce, the key length is not an AES key length, or the tag does not verify.
///
/// # Errors
///
/// Returns [`VaultError`] describing which check rejected the input
pub fn decrypt(ciphertext: &[u8], key: &[u8]) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    let cipher = Cipher::new(key)?;
    let (nonce, sealed) = ciphertext
        .split_at_checked(NONCE_SIZE)
        .ok_or(VaultError::Truncated(ciphertext.len()))?;

    cipher
        .open(nonce, sealed)
        .map(Zeroizing::new)
        .map_err(|_| VaultError::Authentication)
}

/// Encrypt with a fresh random nonce, producing `nonce || sealed`
///
/// # Errors
///
/// Returns [`VaultError`] if the key length is invalid or sealing fails
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, VaultError> {
    let cipher = Cipher::new(key)?;

    let mut nonce = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce);

    let sealed = cipher
        .seal(&nonce, plaintext)
        .map_err(|_| VaultError::Encryption)?;

    let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

    use super::*;

    const KEY_128: &[u8] = b"0123456789abcdef";
    const KEY_192: &[u8] = b"0123456789abcdef01234567";
    const KEY_256: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn test_roundtrip_all_key_sizes() {
        for key in [KEY_128, KEY_192, KEY_256] {
            let sealed = encrypt(b"s3cr3t p@ss", key).unwrap();
            assert_eq!(decrypt(&sealed, key).unwrap().as_slice(), b"s3cr3t p@ss");
        }
    }

    #[test]
    fn test_roundtrip_empty_plaintext() {
        let sealed = encrypt(b"", KEY_256).unwrap();
        assert_eq!(sealed.len(), NONCE_SIZE + 16);
        assert!(decrypt(&sealed, KEY_256).unwrap().is_empty());
    }

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let a = encrypt(b"same", KEY_256).unwrap();
        let b = encrypt(b"same", KEY_256).unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_every_bit_flip_is_rejected() {
        let sealed = encrypt(b"password", KEY_128).unwrap();
        for byte in 0..sealed.len() {
            for bit in 0..8 {
                let mut tampered = sealed.clone();
                tampered[byte] ^= 1 << bit;
                assert_eq!(
                    decrypt(&tampered, KEY_128).unwrap_err(),
                    VaultError::Authentication,
                    "flip of byte {byte} bit {bit} was accepted"
                );
            }
        }
    }

    #[test]
    fn test_wrong_key_rejected() {
        let sealed = encrypt(b"password", KEY_256).unwrap();
        let mut other = KEY_256.to_vec();
        other[0] ^= 0xff;
        assert_eq!(
            decrypt(&sealed, &other).unwrap_err(),
            VaultError::Authentication
        );
    }

    #[test]
    fn test_truncated_ciphertext_rejected() {
        assert_eq!(
            decrypt(&[0u8; 5], KEY_128).unwrap_err(),
            VaultError::Truncated(5)
        );
        assert_eq!(decrypt(&[], KEY_128).unwrap_err(), VaultError::Truncated(0));
        // nonce present but no tag
        assert_eq!(
            decrypt(&[0u8; NONCE_SIZE], KEY_128).unwrap_err(),
            VaultError::Authentication
        );
    }

    #[test]
    fn test_invalid_key_length_rejected() {
        let sealed = encrypt(b"password", KEY_128).unwrap();
        for len in [0, 1, 15, 17, 31, 33, 64] {
            let key = vec![7u8; len];
            assert_eq!(
                decrypt(&sealed, &key).unwrap_err(),
                VaultError::InvalidKeyLength(len)
            );
            assert!(encrypt(b"x", &key).is_err());
        }
    }

    #[test]
    fn test_is_valid_key_length() {
        assert!(is_valid_key_length(16));
        assert!(is_valid_key_length(24));
        assert!(is_valid_key_length(32));
        assert!(!is_valid_key_length(0));
        assert!(!is_valid_key_length(20));
    }
}
