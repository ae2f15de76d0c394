//! Tier-2 blob cache: opaque byte payloads with a time-to-live.
//!
//! Layout of `FileBlobCache`: `{dir}/{hash}.blob` holds the payload and
//! `{dir}/{hash}.meta.json` its sidecar, where `hash` is the blake3 digest of
//! the caller's key.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Expired entries are misses and are deleted on read
//! - Payloads failing their checksum are quarantined (`.quarantined`)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Shared key-value blob store with expiry.
pub trait BlobCache: Send + Sync {
    /// The payload for `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    fn put(&self, key: &str, payload: &[u8], ttl: Duration) -> Result<(), CacheError>;

    fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Deletes every entry and returns how many were removed.
    fn clear(&self) -> Result<usize, CacheError>;
}

/// Metadata sidecar for one cached blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobMeta {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub size: usize,
    pub checksum: String,
}

impl BlobMeta {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct FileBlobCache {
    dir: PathBuf,
}

impl FileBlobCache {
    /// Opens (creating if needed) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stem(key: &str) -> String {
        blake3::hash(key.as_bytes()).to_hex().to_string()
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.blob", Self::stem(key)))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.meta.json", Self::stem(key)))
    }

    fn read_meta(&self, key: &str) -> Result<Option<BlobMeta>, CacheError> {
        let path = self.meta_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    fn quarantine(&self, key: &str) {
        let path = self.blob_path(key);
        let quarantined = path.with_extension("blob.quarantined");
        warn!(path = %path.display(), "blob checksum mismatch, quarantining");
        let _ = fs::rename(&path, &quarantined);
        let _ = fs::remove_file(self.meta_path(key));
    }
}

/// Write to `{path}.tmp` and rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    fs::write(&tmp_path, bytes).map_err(|source| CacheError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn remove_if_present(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(CacheError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl BlobCache for FileBlobCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let Some(meta) = self.read_meta(key)? else {
            return Ok(None);
        };
        if meta.is_expired(Utc::now()) {
            self.remove(key)?;
            return Ok(None);
        }

        let path = self.blob_path(key);
        let payload = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        if blake3::hash(&payload).to_hex().as_str() != meta.checksum {
            self.quarantine(key);
            return Ok(None);
        }
        Ok(Some(payload))
    }

    fn put(&self, key: &str, payload: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let meta = BlobMeta {
            key: key.to_string(),
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            size: payload.len(),
            checksum: blake3::hash(payload).to_hex().to_string(),
        };
        // Payload first: a sidecar never points at a missing blob.
        write_atomic(&self.blob_path(key), payload)?;
        write_atomic(&self.meta_path(key), &serde_json::to_vec_pretty(&meta)?)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        remove_if_present(&self.meta_path(key))?;
        remove_if_present(&self.blob_path(key))?;
        Ok(())
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let mut removed = 0;
        for entry in entries {
            let path = entry
                .map_err(|source| CacheError::Io {
                    path: self.dir.clone(),
                    source,
                })?
                .path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name.ends_with(".meta.json") {
                removed += 1;
            }
            if name.ends_with(".blob")
                || name.ends_with(".meta.json")
                || name.ends_with(".tmp")
                || name.ends_with(".quarantined")
            {
                remove_if_present(&path)?;
            }
        }
        Ok(removed)
    }
}
