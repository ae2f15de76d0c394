//! Scan signatures: the cache-validity keys.
//!
//! A signature is a heuristic freshness proxy built from store metadata
//! (latest date, symbol count, total volume) plus what the scan asked for.
//! It is not a content hash; two different datasets with identical metadata
//! collide and share cache entries.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sigscan_core::StoreMetadata;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanSignature {
    pub max_date: Option<NaiveDate>,
    pub symbol_count: usize,
    pub aggregate_volume: u64,
    pub requested_depth: usize,
    pub signal_ids: BTreeSet<String>,
}

/// The dataset portion of a signature: what decides which bars get loaded.
///
/// `universe` fingerprints the resolved symbol list, so scanners with
/// different market filters or freshness windows never share a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetKey {
    pub max_date: Option<NaiveDate>,
    pub symbol_count: usize,
    pub aggregate_volume: u64,
    pub depth: usize,
    pub universe: String,
}

/// blake3 digest of the sorted universe codes plus whether display names
/// were resolved into the windows.
pub fn universe_fingerprint(codes: &[String], named: bool) -> String {
    let mut hasher = blake3::Hasher::new();
    for code in codes {
        hasher.update(code.as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(if named { b"names:1" } else { b"names:0" });
    hasher.finalize().to_hex().to_string()
}

/// `depth` rounded up to the next multiple of `bucket`.
pub fn bucket_depth(depth: usize, bucket: usize) -> usize {
    if bucket == 0 {
        return depth;
    }
    depth.div_ceil(bucket).max(1) * bucket
}

impl ScanSignature {
    pub fn new(meta: &StoreMetadata, requested_depth: usize, signal_ids: BTreeSet<String>) -> Self {
        Self {
            max_date: meta.max_date,
            symbol_count: meta.symbol_count,
            aggregate_volume: meta.aggregate_volume,
            requested_depth,
            signal_ids,
        }
    }

    /// Dataset key at the bucketed load depth. The signal set is left out:
    /// it does not change which bars are loaded.
    pub fn dataset_key(&self, bucket: usize, universe: String) -> DatasetKey {
        DatasetKey {
            max_date: self.max_date,
            symbol_count: self.symbol_count,
            aggregate_volume: self.aggregate_volume,
            depth: bucket_depth(self.requested_depth, bucket),
            universe,
        }
    }
}

impl fmt::Display for ScanSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self
            .max_date
            .map_or_else(|| "none".to_string(), |d| d.to_string());
        write!(
            f,
            "{date}/{}sym/{}vol/d{}/{}sig",
            self.symbol_count,
            self.aggregate_volume,
            self.requested_depth,
            self.signal_ids.len()
        )
    }
}

impl DatasetKey {
    /// Stable, human-readable blob-cache key. The blob cache maps it to a
    /// file name itself.
    pub fn blob_key(&self) -> String {
        let date = self
            .max_date
            .map_or_else(|| "none".to_string(), |d| d.to_string());
        format!(
            "dataset-{date}-{}sym-{}vol-d{}-u{}",
            self.symbol_count, self.aggregate_volume, self.depth, self.universe
        )
    }
}
