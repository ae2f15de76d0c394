//! SigScan Runner: scan orchestration on top of `sigscan-core`.
//!
//! This crate provides:
//! - `ScanConfig` with production defaults, loadable from TOML
//! - Scan signatures and the two-tier dataset cache (in-process + blob)
//! - The single-slot result cache
//! - A bounded rayon worker pool with per-batch timeouts
//! - Top-gainer aggregation computed in the detection pass
//! - The `Scanner` orchestrator (streaming vs. whole-batch, single-flight,
//!   cancellation, last-good fallback)

pub mod blob_cache;
pub mod config;
pub mod data_cache;
pub mod error;
pub mod gainers;
pub mod progress;
pub mod result;
pub mod result_cache;
pub mod scanner;
pub mod signature;
pub mod worker_pool;

pub use blob_cache::{BlobCache, CacheError, FileBlobCache};
pub use config::{ConfigError, ScanConfig};
pub use data_cache::{CacheTier, DataCache};
pub use error::ScanError;
pub use gainers::{GainerEntry, GainerLists, GainerSpec, GainerTracker, TopGainers};
pub use progress::{ScanPhase, ScanProgress};
pub use result::{ResultSource, ScanReport, ScanResult, ScanStats, ScanStrategy, SignalMatch};
pub use result_cache::ResultCache;
pub use scanner::{ScanRequest, Scanner};
pub use signature::{DatasetKey, ScanSignature};
pub use worker_pool::WorkerPool;
