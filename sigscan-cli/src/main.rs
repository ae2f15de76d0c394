//! SigScan CLI: run scans and manage the dataset cache.
//!
//! Commands:
//! - `scan`: scan a CSV store directory or a synthetic universe
//! - `signals`: list the detector catalog
//! - `cache clear`: delete every blob-cache entry

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sigscan_core::store::synthetic::synthetic_store;
use sigscan_core::{CsvDirStore, NameLookup, SeriesStore, SignalRegistry};
use sigscan_runner::{
    BlobCache, FileBlobCache, ScanConfig, ScanPhase, ScanProgress, ScanReport, ScanRequest,
    Scanner,
};

#[derive(Parser)]
#[command(name = "sigscan", about = "SigScan: batch signal scanner over daily bars")]
struct Cli {
    /// Debug logging for the scanner (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scan and print the matches.
    Scan {
        /// Directory of `<code>.csv` files (plus optional names.csv).
        #[arg(long, conflicts_with = "synthetic")]
        store: Option<PathBuf>,

        /// Scan this many synthetic symbols instead of a store.
        #[arg(long)]
        synthetic: Option<usize>,

        /// Bars per synthetic symbol.
        #[arg(long, default_value_t = 120)]
        bars: usize,

        /// Last synthetic bar date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Comma-separated signal ids. Defaults to every enabled signal.
        #[arg(long, value_delimiter = ',')]
        signals: Vec<String>,

        /// Recompute even if a cached result matches.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Path to a TOML scan config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Blob cache directory. Defaults to the user cache dir.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Disable the on-disk dataset cache.
        #[arg(long, default_value_t = false)]
        no_blob_cache: bool,

        /// Print the result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the built-in signals.
    Signals {
        /// Path to a TOML scan config (for disabled signals).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Blob cache management.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Delete every cached dataset snapshot.
    Clear {
        /// Blob cache directory. Defaults to the user cache dir.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "info,sigscan_runner=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan {
            store,
            synthetic,
            bars,
            end,
            signals,
            force,
            config,
            cache_dir,
            no_blob_cache,
            json,
        } => {
            let source = match (store, synthetic) {
                (Some(dir), None) => Source::CsvDir(dir),
                (None, Some(count)) => Source::Synthetic {
                    count,
                    bars,
                    end: parse_end(end.as_deref())?,
                },
                _ => bail!("one of --store or --synthetic is required"),
            };
            let blob_dir = (!no_blob_cache).then(|| resolve_cache_dir(cache_dir));
            run_scan(source, signals, force, config.as_deref(), blob_dir, json)
        }
        Commands::Signals { config } => run_signals(config.as_deref()),
        Commands::Cache { action } => match action {
            CacheAction::Clear { cache_dir } => run_cache_clear(&resolve_cache_dir(cache_dir)),
        },
    }
}

enum Source {
    CsvDir(PathBuf),
    Synthetic {
        count: usize,
        bars: usize,
        end: NaiveDate,
    },
}

fn parse_end(end: Option<&str>) -> Result<NaiveDate> {
    end.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--end must be YYYY-MM-DD")
        .map(|d| d.unwrap_or_else(|| chrono::Local::now().date_naive()))
}

fn resolve_cache_dir(cache_dir: Option<PathBuf>) -> PathBuf {
    cache_dir.unwrap_or_else(|| {
        dirs::cache_dir()
            .map(|d| d.join("sigscan"))
            .unwrap_or_else(|| PathBuf::from(".sigscan-cache"))
    })
}

fn load_config(path: Option<&Path>) -> Result<ScanConfig> {
    match path {
        Some(p) => ScanConfig::from_file(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(ScanConfig::default()),
    }
}

fn run_scan(
    source: Source,
    signals: Vec<String>,
    force: bool,
    config_path: Option<&Path>,
    blob_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;

    let (store, names): (Arc<dyn SeriesStore>, Arc<dyn NameLookup>) = match source {
        Source::CsvDir(dir) => {
            if !dir.is_dir() {
                bail!("store directory {} does not exist", dir.display());
            }
            let store = Arc::new(CsvDirStore::new(dir));
            (store.clone() as Arc<dyn SeriesStore>, store as Arc<dyn NameLookup>)
        }
        Source::Synthetic { count, bars, end } => {
            info!(count, bars, %end, "generating synthetic universe");
            let store = Arc::new(synthetic_store(count, bars, end));
            (store.clone() as Arc<dyn SeriesStore>, store as Arc<dyn NameLookup>)
        }
    };

    let mut scanner = Scanner::new(store, SignalRegistry::with_builtin(), config)
        .context("building scanner")?
        .with_names(names);
    if let Some(dir) = blob_dir {
        let blob = FileBlobCache::open(&dir)
            .with_context(|| format!("opening cache dir {}", dir.display()))?;
        scanner = scanner.with_blob_cache(Arc::new(blob) as Arc<dyn BlobCache>);
    }

    let unknown: Vec<&str> = signals
        .iter()
        .map(String::as_str)
        .filter(|id| scanner.registry().get(id).is_none())
        .collect();
    if !unknown.is_empty() {
        bail!("unknown signal id(s): {}", unknown.join(", "));
    }

    let request = if signals.is_empty() {
        ScanRequest::all()
    } else {
        ScanRequest::only(signals)
    }
    .with_force(force);

    let progress = |p: &ScanProgress| {
        let phase = match p.phase {
            ScanPhase::Loading => "loading",
            ScanPhase::Scanning => "scanning",
        };
        eprintln!("[{phase}] {}/{}", p.processed, p.total);
    };
    let report = scanner.scan(&request, Some(&progress), None)?;

    if json {
        println!("{}", serde_json::to_string_pretty(report.result.as_ref())?);
    } else {
        print_report(&scanner, &report);
    }
    Ok(())
}

fn print_report(scanner: &Scanner, report: &ScanReport) {
    let result = &report.result;
    let stats = &result.stats;
    println!(
        "Scan {} ({:?}, {:?}): {} symbols, {} evaluated, {} matches in {} ms",
        result.signature,
        report.source,
        stats.strategy,
        stats.universe_size,
        stats.symbols_evaluated,
        result.total_matches(),
        stats.elapsed_ms,
    );
    if stats.batches_skipped > 0 || stats.detector_errors > 0 {
        println!(
            "  skipped batches: {}, detector errors: {}",
            stats.batches_skipped, stats.detector_errors
        );
    }

    for (id, matches) in &result.signals {
        let (icon, name) = scanner
            .registry()
            .get(id)
            .map_or(("", id.as_str()), |d| (d.icon(), d.display_name()));
        println!("\n{icon} {name} [{id}]: {}", matches.len());
        for m in matches.iter().take(10) {
            let metrics: Vec<String> = m.metrics.iter().map(|(k, v)| format!("{k}={v}")).collect();
            println!("  {:<8} {:<20} {}", m.code, m.name, metrics.join(" "));
        }
        if matches.len() > 10 {
            println!("  ... and {} more", matches.len() - 10);
        }
    }

    for (period, lists) in &result.top_gainers {
        println!("\nTop gainers ({period} bars):");
        for e in lists.all.iter().take(5) {
            let flag = if e.has_limit_up { " *" } else { "" };
            println!("  {:<8} {:<20} {:>7.2}%{flag}", e.code, e.name, e.gain_pct);
        }
        if let Some(best) = lists.no_limit_up.first() {
            println!("  best without limit-up: {} {:.2}%", best.code, best.gain_pct);
        }
    }
}

fn run_signals(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let mut registry = SignalRegistry::with_builtin();
    for id in registry.apply_disabled(&config.disabled_signals) {
        eprintln!("warning: unknown signal id {id:?} in disabled_signals");
    }

    println!("{:<22} {:<24} {:>8}  ENABLED", "ID", "NAME", "MIN BARS");
    for def in registry.iter() {
        println!(
            "{:<22} {:<24} {:>8}  {}",
            def.id(),
            format!("{} {}", def.icon(), def.display_name()),
            def.min_bars(),
            if def.enabled { "yes" } else { "no" }
        );
    }
    let enabled = registry.enabled(None);
    println!(
        "\nLoad depth for all enabled signals: {}",
        SignalRegistry::required_depth_with(&enabled, config.depth_margin, config.default_depth)
            .max(config.min_window_len)
    );
    Ok(())
}

fn run_cache_clear(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache dir {} does not exist; nothing to clear", cache_dir.display());
        return Ok(());
    }
    let cache = FileBlobCache::open(cache_dir)?;
    let removed = cache.clear()?;
    println!("Removed {removed} cached dataset(s) from {}", cache_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn signals_flag_splits_on_commas() {
        let cli = Cli::parse_from(["sigscan", "scan", "--synthetic", "10", "--signals", "limit_up,high_turnover"]);
        match cli.command {
            Commands::Scan { signals, synthetic, .. } => {
                assert_eq!(signals, vec!["limit_up", "high_turnover"]);
                assert_eq!(synthetic, Some(10));
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn store_and_synthetic_conflict() {
        let res = Cli::try_parse_from(["sigscan", "scan", "--store", "data", "--synthetic", "5"]);
        assert!(res.is_err());
    }

    #[test]
    fn end_date_parsing() {
        assert_eq!(
            parse_end(Some("2024-06-14")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
        );
        assert!(parse_end(Some("14/06/2024")).is_err());
    }
}
