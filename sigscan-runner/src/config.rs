//! Scan configuration.
//!
//! Every tunable the scanner uses lives here with its production default.
//! Loadable from TOML; missing keys fall back to the defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Universes at least this large are scanned batch-by-batch without
    /// holding the whole dataset.
    pub streaming_threshold: usize,
    pub batch_size: usize,
    /// Per-batch evaluation timeout in milliseconds.
    pub batch_timeout_ms: u64,
    /// Windows shorter than this are not evaluated at all.
    pub min_window_len: usize,
    /// Added to the longest detector minimum to get the load depth.
    pub depth_margin: usize,
    /// Load depth when no detector is enabled.
    pub default_depth: usize,
    /// Whole-batch loads round the depth up to a multiple of this so nearby
    /// depths share a cached dataset.
    pub depth_bucket: usize,
    pub freshness_days: u32,
    /// Accepted code prefixes. Empty accepts every code.
    pub market_prefixes: Vec<String>,
    pub workers: usize,
    pub progress_interval_ms: u64,
    pub blob_ttl_secs: u64,
    pub gainer_periods: Vec<usize>,
    pub limit_up_pct: f64,
    pub top_n: usize,
    pub disabled_signals: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            streaming_threshold: 1200,
            batch_size: 300,
            batch_timeout_ms: 300_000,
            min_window_len: 21,
            depth_margin: 20,
            default_depth: 150,
            depth_bucket: 300,
            freshness_days: 7,
            market_prefixes: ["60", "00", "30", "68"].map(String::from).to_vec(),
            workers: 2,
            progress_interval_ms: 1500,
            blob_ttl_secs: 24 * 60 * 60,
            gainer_periods: vec![5, 10, 20],
            limit_up_pct: 9.5,
            top_n: 40,
            disabled_signals: Vec::new(),
        }
    }
}

impl ScanConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("batch_size", self.batch_size),
            ("min_window_len", self.min_window_len),
            ("default_depth", self.default_depth),
            ("depth_bucket", self.depth_bucket),
            ("workers", self.workers),
            ("top_n", self.top_n),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be > 0")));
            }
        }
        if self.batch_timeout_ms == 0 {
            return Err(ConfigError::Invalid("batch_timeout_ms must be > 0".into()));
        }
        if self.gainer_periods.contains(&0) {
            return Err(ConfigError::Invalid("gainer periods must be > 0".into()));
        }
        if !(self.limit_up_pct.is_finite() && self.limit_up_pct > 0.0) {
            return Err(ConfigError::Invalid("limit_up_pct must be a positive number".into()));
        }
        Ok(())
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn blob_ttl(&self) -> Duration {
        Duration::from_secs(self.blob_ttl_secs)
    }

    /// Market-eligibility filter on symbol codes.
    pub fn accepts_code(&self, code: &str) -> bool {
        self.market_prefixes.is_empty()
            || self.market_prefixes.iter().any(|p| code.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_constants() {
        let c = ScanConfig::default();
        assert_eq!(c.streaming_threshold, 1200);
        assert_eq!(c.batch_size, 300);
        assert_eq!(c.batch_timeout(), Duration::from_secs(300));
        assert_eq!(c.min_window_len, 21);
        assert_eq!(c.blob_ttl(), Duration::from_secs(86_400));
        assert_eq!(c.gainer_periods, vec![5, 10, 20]);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ScanConfig::from_toml("batch_size = 50\nmarket_prefixes = []\n").unwrap();
        assert_eq!(c.batch_size, 50);
        assert_eq!(c.top_n, 40);
        assert!(c.accepts_code("900001"));
    }

    #[test]
    fn toml_roundtrip() {
        let c = ScanConfig::default();
        let parsed = ScanConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(c, parsed);
    }

    #[test]
    fn rejects_zero_batch_size() {
        let err = ScanConfig::from_toml("batch_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn prefix_filter() {
        let c = ScanConfig::default();
        assert!(c.accepts_code("600519"));
        assert!(c.accepts_code("300750"));
        assert!(!c.accepts_code("830799"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ScanConfig::from_file(Path::new("/nonexistent/sigscan.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
