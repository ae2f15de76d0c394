//! Two-tier dataset cache.
//!
//! Tier 1 is a single in-process slot; a different key evicts it outright.
//! Tier 2 is an optional `BlobCache` holding JSON snapshots with a TTL. A
//! Tier 2 hit is promoted into Tier 1. Tier 2 failures are logged and
//! treated as a miss or a no-op; they never fail a scan.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sigscan_core::Dataset;
use tracing::{debug, warn};

use crate::blob_cache::BlobCache;
use crate::signature::DatasetKey;

/// Which tier served a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    Memory,
    Blob,
}

/// What goes into Tier 2: the key travels with the data so a hash
/// collision on the blob key cannot serve the wrong dataset.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    key: DatasetKey,
    dataset: Dataset,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    key: &'a DatasetKey,
    dataset: &'a Dataset,
}

type Slot = Option<(DatasetKey, Arc<Dataset>)>;

/// The slot lock is only held to swap an `Arc`; Tier 2 file I/O and JSON
/// work run without it.
pub struct DataCache {
    slot: Mutex<Slot>,
    blob: Option<Arc<dyn BlobCache>>,
    ttl: Duration,
}

impl DataCache {
    pub fn new(blob: Option<Arc<dyn BlobCache>>, ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            blob,
            ttl,
        }
    }

    pub fn set_blob_cache(&mut self, blob: Arc<dyn BlobCache>) {
        self.blob = Some(blob);
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &DatasetKey) -> Option<(Arc<Dataset>, CacheTier)> {
        if let Some((slot_key, dataset)) = self.slot().as_ref() {
            if slot_key == key {
                return Some((Arc::clone(dataset), CacheTier::Memory));
            }
        }

        let blob = self.blob.as_ref()?;
        let blob_key = key.blob_key();
        let bytes = match blob.get(&blob_key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(blob_key = %blob_key, "tier-2 miss");
                return None;
            }
            Err(e) => {
                warn!(blob_key = %blob_key, error = %e, "tier-2 read failed, treating as miss");
                return None;
            }
        };
        let snapshot: Snapshot = match serde_json::from_slice(&bytes) {
            Ok(s) => s,
            Err(e) => {
                warn!(blob_key = %blob_key, error = %e, "tier-2 snapshot undecodable, treating as miss");
                return None;
            }
        };
        if snapshot.key != *key {
            warn!(blob_key = %blob_key, "tier-2 snapshot key mismatch, treating as miss");
            return None;
        }

        let dataset = Arc::new(snapshot.dataset);
        *self.slot() = Some((key.clone(), Arc::clone(&dataset)));
        Some((dataset, CacheTier::Blob))
    }

    pub fn put(&self, key: DatasetKey, dataset: Arc<Dataset>) {
        if let Some(blob) = &self.blob {
            let blob_key = key.blob_key();
            let snapshot = SnapshotRef {
                key: &key,
                dataset: dataset.as_ref(),
            };
            match serde_json::to_vec(&snapshot) {
                Ok(bytes) => {
                    if let Err(e) = blob.put(&blob_key, &bytes, self.ttl) {
                        warn!(blob_key = %blob_key, error = %e, "tier-2 write failed");
                    }
                }
                Err(e) => warn!(blob_key = %blob_key, error = %e, "tier-2 snapshot encode failed"),
            }
        }
        *self.slot() = Some((key, dataset));
    }

    /// Drops the Tier 1 slot. Tier 2 entries expire on their own.
    pub fn clear(&self) {
        *self.slot() = None;
    }

    pub fn cached_key(&self) -> Option<DatasetKey> {
        self.slot().as_ref().map(|(k, _)| k.clone())
    }
}
