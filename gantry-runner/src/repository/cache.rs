//! Cache store adapter
//!
//! Key-value semantics over content-hash keys: `get` returns the stored
//! dependency directory for an exact key, `put` stores a freshly populated
//! one. Writes go through a temp entry plus rename, so concurrent writers
//! of the same key settle last-writer-wins without corrupting each other.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use gantry_core::domain::cache::CacheKey;

/// Repository trait for the external cache store
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Looks up an exact key
    ///
    /// # Returns
    /// The stored directory reference, or `None` on a miss
    async fn get(&self, key: &CacheKey) -> Result<Option<PathBuf>>;

    /// Looks up the most recent entry whose key starts with `prefix`
    ///
    /// Best-effort partial-restore affordance; callers must not treat a
    /// prefix match as a full hit.
    async fn get_by_prefix(&self, prefix: &str) -> Result<Option<PathBuf>>;

    /// Stores a populated directory under the key
    async fn put(&self, key: &CacheKey, path: &Path) -> Result<()>;
}

/// Directory-backed cache store
///
/// Each entry lives at `<root>/<key>`. Retention is bounded: after every
/// write the oldest entries beyond `max_entries` are pruned.
pub struct LocalCacheStore {
    root: PathBuf,
    max_entries: usize,
}

impl LocalCacheStore {
    /// Creates a store rooted at the given directory
    pub fn new(root: PathBuf, max_entries: usize) -> Self {
        Self { root, max_entries }
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Removes the oldest entries beyond the retention bound
    async fn prune(&self) -> Result<()> {
        let mut entries: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();

        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .context("Failed to read cache root")?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(".tmp-") {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            entries.push((entry.path(), modified));
        }

        if entries.len() <= self.max_entries {
            return Ok(());
        }

        entries.sort_by_key(|(_, modified)| *modified);
        let excess = entries.len() - self.max_entries;
        for (path, _) in entries.into_iter().take(excess) {
            debug!("Pruning cache entry {}", path.display());
            let target = path.clone();
            let removed = tokio::task::spawn_blocking(move || remove_entry(&target)).await;
            if let Err(e) = removed.map_err(anyhow::Error::from).and_then(|r| r) {
                warn!("Failed to prune cache entry {}: {}", path.display(), e);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl CacheStore for LocalCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<PathBuf>> {
        let path = self.entry_path(key);
        if tokio::fs::try_exists(&path).await? {
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }

    async fn get_by_prefix(&self, prefix: &str) -> Result<Option<PathBuf>> {
        let mut best: Option<(PathBuf, std::time::SystemTime)> = None;

        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .context("Failed to read cache root")?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(".tmp-") || !name.starts_with(prefix) {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            if best.as_ref().is_none_or(|(_, m)| modified > *m) {
                best = Some((entry.path(), modified));
            }
        }

        Ok(best.map(|(path, _)| path))
    }

    async fn put(&self, key: &CacheKey, path: &Path) -> Result<()> {
        if !tokio::fs::try_exists(path).await? {
            anyhow::bail!("cache source {} does not exist", path.display());
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .context("Failed to create cache root")?;

        let staging = self.root.join(format!(".tmp-{}", Uuid::new_v4()));
        let target = self.entry_path(key);
        let source = path.to_path_buf();

        // The recursive copy is blocking work; hand it off so the runtime
        // stays responsive during large entries.
        let committed = target.clone();
        tokio::task::spawn_blocking(move || commit_entry(&source, &staging, &committed))
            .await
            .context("Cache write task failed")?
            .with_context(|| format!("Failed to commit cache entry for key {}", key))?;

        debug!("Stored cache entry {} -> {}", key, target.display());

        self.prune().await
    }
}

/// Copies the source into a staging entry, then renames it into place so a
/// concurrent reader never sees a half-written directory; the rename
/// settles last-writer-wins.
fn commit_entry(from: &Path, staging: &Path, target: &Path) -> Result<()> {
    copy_entry(from, staging)?;
    if target.exists() {
        remove_entry(target)?;
    }
    std::fs::rename(staging, target)?;
    Ok(())
}

/// Copies a file or directory tree
fn copy_entry(from: &Path, to: &Path) -> Result<()> {
    if from.is_dir() {
        std::fs::create_dir_all(to)?;
        for entry in std::fs::read_dir(from)? {
            let entry = entry?;
            copy_entry(&entry.path(), &to.join(entry.file_name()))?;
        }
    } else {
        std::fs::copy(from, to)?;
    }
    Ok(())
}

/// Removes a file or directory tree
fn remove_entry(path: &Path) -> Result<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
