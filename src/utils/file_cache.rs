use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::models::{cache::CacheEntry, error::Error};

static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Read/write-through JSON cache on disk. One file per key.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    ttl_seconds: i64,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>, ttl_seconds: i64) -> Result<Self, Error> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(FileCache { dir, ttl_seconds })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Builds a filesystem-safe key from its parts, e.g. `session-2023-monza-race`.
    pub fn key(parts: &[&str]) -> String {
        parts
            .iter()
            .map(|part| {
                part.trim()
                    .to_lowercase()
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("-")
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Missing, expired and unreadable entries are all misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path(key);
        let data = tokio::fs::read(&path).await.ok()?;

        let entry: CacheEntry<T> = match serde_json::from_slice(&data) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(%key, "Discarding unreadable cache entry: {e}");
                return None;
            }
        };

        if entry.is_expired() {
            debug!(%key, expired_at = %entry.expires_at, "Cache entry expired");
            return None;
        }

        debug!(%key, "Cache hit");
        Some(entry.value)
    }

    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Error> {
        let entry = CacheEntry::new(value, self.ttl_seconds);
        let json = serde_json::to_vec(&entry)?;

        // Readers only ever see a complete file; each writer gets its own
        // temp file so concurrent writers of one key cannot collide.
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!(".{key}.{}.{seq}.json.tmp", std::process::id()));
        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.path(key)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(%key, "Cache entry written");
        Ok(())
    }

    /// Like `put`, but a failed write is only logged. The value is still good
    /// to serve; it just has to be fetched again next time.
    pub async fn store<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.put(key, value).await {
            warn!(%key, "Could not write cache entry: {e}");
        }
    }
}
