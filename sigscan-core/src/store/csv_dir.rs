//! CSV-directory store: one `<code>.csv` per symbol plus an optional
//! `names.csv` mapping codes to display names.
//!
//! Bar files carry the header `date,open,high,low,close,volume,turnover_rate`
//! in any row order. Every call reads from disk, so edits made between scans
//! are visible to the next one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{freshness_cutoff, newest_first, normalize, NameLookup, SeriesStore, StoreError, StoreMetadata};
use crate::domain::Bar;

const NAMES_FILE: &str = "names.csv";

#[derive(Debug, Clone)]
pub struct CsvDirStore {
    root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct NameRow {
    code: String,
    name: String,
}

impl CsvDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn series_path(&self, code: &str) -> PathBuf {
        self.root.join(format!("{code}.csv"))
    }

    /// Codes of every series file, sorted.
    fn codes(&self) -> Result<Vec<String>, StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        let entries = std::fs::read_dir(&self.root).map_err(|e| self.io(&self.root, e))?;
        let mut codes = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| self.io(&self.root, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if path.file_name().and_then(|n| n.to_str()) == Some(NAMES_FILE) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                codes.push(stem.to_string());
            }
        }
        codes.sort();
        Ok(codes)
    }

    /// Ascending, date-unique bars for one code.
    fn read_series(&self, path: &Path) -> Result<Vec<Bar>, StoreError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| parse_error(path, e))?;
        let mut bars = Vec::new();
        for row in reader.deserialize::<Bar>() {
            bars.push(row.map_err(|e| parse_error(path, e))?);
        }
        normalize(&mut bars);
        Ok(bars)
    }

    fn read_all(&self) -> Result<Vec<(String, Vec<Bar>)>, StoreError> {
        self.codes()?
            .into_iter()
            .map(|code| {
                let bars = self.read_series(&self.series_path(&code))?;
                Ok((code, bars))
            })
            .collect()
    }

    fn io(&self, path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn parse_error(path: &Path, err: csv::Error) -> StoreError {
    StoreError::Parse {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

impl SeriesStore for CsvDirStore {
    fn list_eligible_symbols(&self, freshness_days: u32) -> Result<Vec<String>, StoreError> {
        let all = self.read_all()?;
        let Some(latest) = all.iter().filter_map(|(_, b)| b.last()).map(|b| b.date).max() else {
            return Ok(Vec::new());
        };
        let cutoff = freshness_cutoff(latest, freshness_days);
        Ok(all
            .into_iter()
            .filter(|(_, bars)| bars.last().is_some_and(|b| b.date >= cutoff))
            .map(|(code, _)| code)
            .collect())
    }

    fn latest_metadata(&self) -> Result<StoreMetadata, StoreError> {
        let mut meta = StoreMetadata::default();
        for (_, bars) in self.read_all()? {
            if bars.is_empty() {
                continue;
            }
            meta.symbol_count += 1;
            meta.aggregate_volume = bars
                .iter()
                .fold(meta.aggregate_volume, |acc, b| acc.saturating_add(b.volume));
            meta.max_date = meta.max_date.max(bars.last().map(|b| b.date));
        }
        Ok(meta)
    }

    fn load_bars(
        &self,
        codes: &[String],
        max_depth: usize,
    ) -> Result<HashMap<String, Vec<Bar>>, StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        let mut out = HashMap::with_capacity(codes.len());
        for code in codes {
            let path = self.series_path(code);
            if !path.is_file() {
                continue;
            }
            let bars = self.read_series(&path)?;
            out.insert(code.clone(), newest_first(&bars, max_depth));
        }
        Ok(out)
    }
}

impl NameLookup for CsvDirStore {
    fn display_names(&self, codes: &[String]) -> Result<HashMap<String, String>, StoreError> {
        let path = self.root.join(NAMES_FILE);
        if !path.is_file() {
            return Ok(HashMap::new());
        }
        let mut reader = csv::Reader::from_path(&path).map_err(|e| parse_error(&path, e))?;
        let mut all = HashMap::new();
        for row in reader.deserialize::<NameRow>() {
            let row = row.map_err(|e| parse_error(&path, e))?;
            all.insert(row.code, row.name);
        }
        Ok(codes
            .iter()
            .filter_map(|c| all.get(c).map(|n| (c.clone(), n.clone())))
            .collect())
    }
}

/// Writes bars for one code in the layout `CsvDirStore` reads.
pub fn write_series(root: &Path, code: &str, bars: &[Bar]) -> Result<(), StoreError> {
    let path = root.join(format!("{code}.csv"));
    let mut writer = csv::Writer::from_path(&path).map_err(|e| parse_error(&path, e))?;
    for bar in bars {
        writer.serialize(bar).map_err(|e| parse_error(&path, e))?;
    }
    writer.flush().map_err(|source| StoreError::Io { path, source })
}
