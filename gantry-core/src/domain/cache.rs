//! Dependency cache types
//!
//! Cache keys are content hashes of the dependency lock file, so two runs
//! with byte-identical lock files share one key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Content-derived cache key (lowercase hex SHA-256)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key from lock-file contents
    ///
    /// Order-sensitive and byte-exact: any change to the lock file yields a
    /// different key.
    pub fn from_lock_file(contents: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(contents);
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one cache lookup
///
/// Computed once per run when the caching stage executes and never mutated
/// afterwards. A hit gates the dependency-install stage off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    /// Restored dependency directory; `None` on a miss
    pub path_ref: Option<PathBuf>,
    pub hit: bool,
}

impl CacheEntry {
    pub fn hit(key: CacheKey, path_ref: PathBuf) -> Self {
        Self {
            key,
            path_ref: Some(path_ref),
            hit: true,
        }
    }

    pub fn miss(key: CacheKey) -> Self {
        Self {
            key,
            path_ref: None,
            hit: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        let a = CacheKey::from_lock_file(b"[[package]]\nname = \"serde\"\n");
        let b = CacheKey::from_lock_file(b"[[package]]\nname = \"serde\"\n");
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_is_content_sensitive() {
        let a = CacheKey::from_lock_file(b"name = \"serde\"");
        let b = CacheKey::from_lock_file(b"name = \"tokio\"");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_is_hex_sha256() {
        let key = CacheKey::from_lock_file(b"");
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
