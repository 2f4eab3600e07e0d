//! Cache resolution service
//!
//! Derives the content-hash key from the dependency lock file, asks the
//! store for it, and decides hit or miss. A store that cannot be reached is
//! a forced miss, never a failure: the install stage then simply runs.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use gantry_core::domain::cache::{CacheEntry, CacheKey};

use crate::repository::CacheStore;

/// Service trait for cache resolution
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Computes the key for the lock-file contents and looks it up
    ///
    /// # Returns
    /// The entry for this run: `hit=true` with the stored directory
    /// reference on an exact match, `hit=false` otherwise. A prefix
    /// fallback may populate `path_ref` on a miss as a partial restore;
    /// it never upgrades the miss to a hit.
    async fn resolve(&self, lock_file_contents: &[u8]) -> CacheEntry;

    /// Stores the freshly populated directory under the key
    ///
    /// Called after the dependency-install stage succeeds on a miss.
    /// Write-through: failures are logged and swallowed, the run already
    /// has its dependencies.
    async fn store(&self, key: &CacheKey, path: &Path);
}

/// Standard implementation of CacheService
pub struct StandardCacheService {
    store: Arc<dyn CacheStore>,
    /// Length of the key prefix used for the fallback lookup
    restore_prefix_len: usize,
}

impl StandardCacheService {
    /// Creates a cache service over the given store
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            restore_prefix_len: 8,
        }
    }
}

#[async_trait]
impl CacheService for StandardCacheService {
    async fn resolve(&self, lock_file_contents: &[u8]) -> CacheEntry {
        let key = CacheKey::from_lock_file(lock_file_contents);
        debug!("Resolving cache key {}", key);

        match self.store.get(&key).await {
            Ok(Some(path)) => {
                info!("Cache hit for key {}", key);
                return CacheEntry::hit(key, path);
            }
            Ok(None) => {}
            Err(e) => {
                // Store unreachable: forced miss, the install stage runs.
                warn!("Cache store unavailable, treating as miss: {}", e);
                return CacheEntry::miss(key);
            }
        }

        // Best-effort partial restore before declaring a full miss.
        let prefix = &key.as_str()[..self.restore_prefix_len.min(key.as_str().len())];
        match self.store.get_by_prefix(prefix).await {
            Ok(Some(path)) => {
                info!("Cache miss for key {}, partial restore from prefix", key);
                CacheEntry {
                    key,
                    path_ref: Some(path),
                    hit: false,
                }
            }
            Ok(None) => {
                info!("Cache miss for key {}", key);
                CacheEntry::miss(key)
            }
            Err(e) => {
                warn!("Cache prefix lookup failed, treating as miss: {}", e);
                CacheEntry::miss(key)
            }
        }
    }

    async fn store(&self, key: &CacheKey, path: &Path) {
        if let Err(e) = self.store.put(key, path).await {
            warn!("Failed to store cache entry {}: {}", key, e);
        }
    }
}
