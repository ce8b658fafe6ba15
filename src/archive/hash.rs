use crate::error::{PsarcError, Result};
use md5::{Digest, Md5};
use std::fmt;

/// Hash size in bytes
pub const HASH_SIZE: usize = 16;

/// Normalize path to forward slashes (cross-platform compatibility)
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Apply the archive's case rule to an already normalized path
pub(crate) fn fold_case(path: &str, case_insensitive: bool) -> String {
    if case_insensitive {
        path.to_ascii_uppercase()
    } else {
        path.to_string()
    }
}

/// 128-bit path hash identifying an entry
///
/// The hash of a path is the MD5 digest of its bytes after backslashes are
/// turned into slashes and, for case-insensitive archives, after upper-casing.
/// Only ASCII letters are folded; other characters are hashed as their UTF-8
/// bytes unchanged. The all-zero hash is reserved for the manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PathHash([u8; HASH_SIZE]);

impl PathHash {
    /// Hash of the manifest pseudo-entry
    pub const MANIFEST: PathHash = PathHash([0u8; HASH_SIZE]);

    /// Create a path hash from raw bytes
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Compute the MD5 of arbitrary data
    pub fn from_data(data: &[u8]) -> Self {
        let mut hasher = Md5::new();
        hasher.update(data);
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    /// Hash an archive path the way a reader resolves it
    pub fn from_path(path: &str, case_insensitive: bool) -> Self {
        let folded = fold_case(&normalize_path(path), case_insensitive);
        Self::from_data(folded.as_bytes())
    }

    /// Parse a hash from 32 hex digits
    pub fn from_hex(hex: &str) -> Result<Self> {
        let mut bytes = [0u8; HASH_SIZE];
        hex::decode_to_slice(hex, &mut bytes)
            .map_err(|e| PsarcError::InvalidFormat(format!("Invalid path hash {:?}: {}", hex, e)))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Whether this is the reserved manifest hash
    pub fn is_manifest(&self) -> bool {
        *self == Self::MANIFEST
    }
}

impl fmt::Display for PathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; HASH_SIZE]> for PathHash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }
}
