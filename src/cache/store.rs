//! Filesystem-backed cache store
//!
//! Reads and writes are best effort: a failed read is a miss, a
//! failed write is logged and swallowed. The cache only ever
//! accelerates a build, it must never fail one.

use crate::cache::key::CacheKey;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Content-addressed store of rendered image bytes
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    ext: String,
}

impl CacheStore {
    /// Create a store rooted at `<root>/<namespace>`
    pub fn new(root: impl Into<PathBuf>, namespace: &str, ext: &str) -> Self {
        Self {
            dir: root.into().join(namespace),
            ext: ext.to_string(),
        }
    }

    /// The file an entry for `key` lives at
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.{}", key.as_hex(), self.ext))
    }

    /// The directory entries are stored under
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up an entry; a missing or unreadable entry is a miss
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                debug!("Cache hit: {}", key);
                Some(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Cache read failed for {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store an entry, creating the cache directory if needed
    ///
    /// Write failures are logged and swallowed; they must never fail
    /// the render that produced the bytes.
    pub async fn put(&self, key: &CacheKey, bytes: &[u8]) {
        if let Err(e) = fs::create_dir_all(&self.dir).await {
            warn!("Cache dir create failed for {}: {}", self.dir.display(), e);
            return;
        }

        let path = self.entry_path(key);
        if let Err(e) = fs::write(&path, bytes).await {
            warn!("Cache write failed for {}: {}", path.display(), e);
        } else {
            debug!("Cached {} bytes at {}", bytes.len(), path.display());
        }
    }
}
