use super::{cipher, legacy};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::{
    fmt,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Environment variable holding the key when no key file is given
pub const KEY_ENV: &str = "DB_SECRET_KEY";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("DB_SECRET_KEY environment variable is not set and no key file was given")]
    Missing,

    #[error("secret key from {0} is empty")]
    Empty(String),

    #[error("could not read key file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key file {0} is not a regular file")]
    NotAFile(PathBuf),

    #[error(
        "key file {path} has mode {mode:o}, it must only be accessible by its owner (e.g. chmod 400)"
    )]
    Permissions { path: PathBuf, mode: u32 },

    #[error("secret key is {0} bytes, expected 16, 24 or 32")]
    InvalidLength(usize),

    #[error("legacy obfuscated key is not valid base64: {0}")]
    LegacyEncoding(#[from] base64::DecodeError),

    #[error(transparent)]
    Legacy(#[from] legacy::LegacyError),
}

/// AES key material, zeroed on drop and never printed
#[derive(Clone)]
pub struct VaultKey(Zeroizing<Vec<u8>>);

impl VaultKey {
    /// Wrap raw key bytes, checking that they form an AES key
    ///
    /// # Errors
    ///
    /// Returns an error if the length is not 16, 24 or 32 bytes
    pub fn new(bytes: Vec<u8>) -> Result<Self, KeyError> {
        let bytes = Zeroizing::new(bytes);
        if !cipher::is_valid_key_length(bytes.len()) {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        Ok(Self(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VaultKey({} bytes)", self.0.len())
    }
}

/// Where the key comes from, resolved once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySource {
    /// Key file, takes precedence over the environment
    pub file: Option<PathBuf>,
    /// Base64 legacy XOR-obfuscated key, see [`legacy`]
    pub legacy_obfuscated: Option<String>,
}

impl KeySource {
    /// Resolve the key from the file or the [`KEY_ENV`] environment variable
    ///
    /// # Errors
    ///
    /// Returns an error if no key is available, the key file is readable by
    /// others, or the resulting key is not a valid AES key
    pub fn resolve(&self) -> Result<VaultKey, KeyError> {
        self.resolve_with_env(std::env::var(KEY_ENV).ok())
    }

    /// Same as [`KeySource::resolve`] with the environment value passed in
    ///
    /// # Errors
    ///
    /// See [`KeySource::resolve`]
    pub fn resolve_with_env(&self, env_value: Option<String>) -> Result<VaultKey, KeyError> {
        let raw = if let Some(path) = &self.file {
            debug!(path = %path.display(), "reading secret key from file");
            read_key_file(path)?
        } else {
            let value = env_value.ok_or(KeyError::Missing)?;
            if value.is_empty() {
                return Err(KeyError::Empty(KEY_ENV.to_string()));
            }
            Zeroizing::new(value.into_bytes())
        };

        let raw = match &self.legacy_obfuscated {
            Some(encoded) => {
                warn!("using legacy XOR key obfuscation, this provides no cryptographic protection");
                let obfuscated = Zeroizing::new(STANDARD.decode(encoded.trim())?);
                legacy::xor_deobfuscate(&obfuscated, &raw)?
            }
            None => raw,
        };

        VaultKey::new(raw.to_vec())
    }
}

/// Read a key file, enforcing owner-only permissions on Unix
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a regular file, is
/// accessible by group or others, or is empty
pub fn read_key_file(path: &Path) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let read_err = |source| KeyError::Read {
        path: path.to_path_buf(),
        source,
    };

    let metadata = std::fs::metadata(path).map_err(read_err)?;
    if !metadata.is_file() {
        return Err(KeyError::NotAFile(path.to_path_buf()));
    }
    check_permissions(path, &metadata)?;

    let mut data = Zeroizing::new(std::fs::read(path).map_err(read_err)?);
    if data.last() == Some(&b'\n') {
        data.pop();
        if data.last() == Some(&b'\r') {
            data.pop();
        }
    }

    if data.is_empty() {
        return Err(KeyError::Empty(path.display().to_string()));
    }

    Ok(data)
}

#[cfg(unix)]
fn check_permissions(path: &Path, metadata: &std::fs::Metadata) -> Result<(), KeyError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(KeyError::Permissions {
            path: path.to_path_buf(),
            mode,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn check_permissions(_path: &Path, _metadata: &std::fs::Metadata) -> Result<(), KeyError> {
    Ok(())
}
