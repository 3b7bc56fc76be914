//! Legacy key deobfuscation.
//!
//! Older deployments stored the encryption key XOR-ed with a repeating
//! passphrase. This is obfuscation only: it has no integrity check and
//! offers no confidentiality against anyone who can read both inputs. It is
//! kept so existing obfuscated keys keep working and is never applied to
//! stored credentials.

use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LegacyError {
    #[error("legacy deobfuscation needs a non-empty key")]
    EmptyKey,
}

/// XOR `data` with `key` repeated to the length of `data`
///
/// # Errors
///
/// Returns an error if `key` is empty
pub fn xor_deobfuscate(data: &[u8], key: &[u8]) -> Result<Zeroizing<Vec<u8>>, LegacyError> {
    if key.is_empty() {
        return Err(LegacyError::EmptyKey);
    }

    Ok(Zeroizing::new(
        data.iter()
            .zip(key.iter().cycle())
            .map(|(d, k)| d ^ k)
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_xor_is_involution() {
        let key = b"pass";
        let original = b"0123456789abcdef0123456789abcdef";
        let obfuscated = xor_deobfuscate(original, key).unwrap();
        assert_ne!(obfuscated.as_slice(), original);
        let restored = xor_deobfuscate(&obfuscated, key).unwrap();
        assert_eq!(restored.as_slice(), original);
    }

    #[test]
    fn test_key_repeats() {
        let out = xor_deobfuscate(&[0, 0, 0, 0, 0], &[1, 2]).unwrap();
        assert_eq!(out.as_slice(), &[1, 2, 1, 2, 1]);
    }

    #[test]
    fn test_empty_key_rejected() {
        assert_eq!(
            xor_deobfuscate(b"abc", b"").unwrap_err(),
            LegacyError::EmptyKey
        );
    }

    #[test]
    fn test_empty_data() {
        assert!(xor_deobfuscate(b"", b"k").unwrap().is_empty());
    }
}
