//! The scan orchestrator.
//!
//! Orchestration (store reads, cache reads/writes, progress callbacks) runs
//! on the caller's thread; detector evaluation runs on the worker pool. One
//! scan at a time per `Scanner`: a concurrent call fails fast with
//! `ScanError::InProgress`.
//!
//! Pass outline:
//! 1. metadata → signature → result-cache check
//! 2. universe (freshness window, market prefixes, sorted, unique)
//! 3. streaming (per-batch load + evaluate) or whole-batch (load everything,
//!    via the data cache, then evaluate per batch)
//! 4. merge matches and gainers per batch, finalize, cache, return

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use sigscan_core::{
    Bar, Dataset, NameLookup, SeriesStore, SeriesWindow, SignalDefinition, SignalRegistry, Symbol,
};
use tracing::{debug, error, info, warn};

use crate::blob_cache::BlobCache;
use crate::config::ScanConfig;
use crate::data_cache::{CacheTier, DataCache};
use crate::error::ScanError;
use crate::gainers::{GainerSpec, GainerTracker};
use crate::progress::{ProgressThrottle, ScanPhase, ScanProgress};
use crate::result::{ResultSource, ScanReport, ScanResult, ScanStats, ScanStrategy, SignalMatch};
use crate::result_cache::ResultCache;
use crate::signature::{universe_fingerprint, DatasetKey, ScanSignature};
use crate::worker_pool::{BatchJob, BatchOutcome, WorkerPool};

/// How often a batch wait wakes up to check the cancel flag.
const POLL_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRequest {
    /// Skip the result cache and recompute.
    pub force: bool,
    /// Restrict to these signal ids. `None` runs every enabled signal.
    pub signal_ids: Option<BTreeSet<String>>,
}

impl ScanRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn forced() -> Self {
        Self {
            force: true,
            signal_ids: None,
        }
    }

    pub fn only<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            force: false,
            signal_ids: Some(ids.into_iter().map(Into::into).collect()),
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Mutable state, written only by the scan holding the in-progress flag.
struct ScanState {
    results: ResultCache,
    last_good: Option<Arc<ScanResult>>,
}

/// Releases the in-progress flag on every exit path, panics included.
struct ScanGuard<'a>(&'a AtomicBool);

impl<'a> ScanGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Where a pass was when it failed, for the error log.
#[derive(Debug, Default)]
struct PassTrace {
    signature: Option<String>,
    batch: Option<usize>,
    phase: Option<ScanPhase>,
}

/// Per-scan inputs that do not change between batches.
struct PassPlan<'p> {
    signature: ScanSignature,
    detectors: Arc<[SignalDefinition]>,
    gainers: Arc<GainerSpec>,
    depth: usize,
    cancel: Option<&'p AtomicBool>,
    trace: &'p RefCell<PassTrace>,
}

impl PassPlan<'_> {
    fn check_cancel(&self) -> Result<(), ScanError> {
        if self.cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
            return Err(ScanError::Cancelled);
        }
        Ok(())
    }

    fn enter(&self, batch: usize, phase: ScanPhase) {
        let mut trace = self.trace.borrow_mut();
        trace.batch = Some(batch);
        trace.phase = Some(phase);
    }
}

/// Running totals for one pass.
struct PassAccumulator {
    matches: BTreeMap<String, Vec<SignalMatch>>,
    gainers: GainerTracker,
    stats: ScanStats,
    load_failures: usize,
}

impl PassAccumulator {
    fn absorb(&mut self, outcome: BatchOutcome) {
        for (id, hits) in outcome.matches {
            let list = self.matches.entry(id).or_default();
            list.extend(hits.into_iter().map(|m| SignalMatch {
                code: m.code,
                name: m.name,
                metrics: m.metrics,
            }));
        }
        self.gainers.merge(outcome.gainer_samples);
        self.stats.symbols_evaluated += outcome.symbols_evaluated;
        self.stats.detector_errors += outcome.detector_errors;
    }
}

pub struct Scanner {
    store: Arc<dyn SeriesStore>,
    names: Option<Arc<dyn NameLookup>>,
    registry: SignalRegistry,
    config: ScanConfig,
    pool: WorkerPool,
    scanning: AtomicBool,
    data: DataCache,
    state: Mutex<ScanState>,
}

impl Scanner {
    /// Validates the config, applies its disabled-signal list and builds
    /// the worker pool.
    pub fn new(
        store: Arc<dyn SeriesStore>,
        mut registry: SignalRegistry,
        config: ScanConfig,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        for id in registry.apply_disabled(&config.disabled_signals) {
            warn!(id = %id, "ignoring unknown signal in disabled_signals");
        }
        let pool = WorkerPool::new(config.workers)?;
        let data = DataCache::new(None, config.blob_ttl());
        Ok(Self {
            store,
            names: None,
            registry,
            config,
            pool,
            scanning: AtomicBool::new(false),
            data,
            state: Mutex::new(ScanState {
                results: ResultCache::default(),
                last_good: None,
            }),
        })
    }

    pub fn with_names(mut self, names: Arc<dyn NameLookup>) -> Self {
        self.names = Some(names);
        self
    }

    /// Enables the Tier-2 dataset cache.
    pub fn with_blob_cache(mut self, blob: Arc<dyn BlobCache>) -> Self {
        self.data.set_blob_cache(blob);
        self
    }

    pub fn registry(&self) -> &SignalRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Non-blocking; safe to call from another thread during a scan.
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    /// The last successfully computed result, if any.
    pub fn last_result(&self) -> Option<Arc<ScanResult>> {
        self.state().last_good.clone()
    }

    /// Drops the in-process dataset and result caches. The last good result
    /// is kept for fallback.
    pub fn invalidate(&self) {
        self.data.clear();
        self.state().results.clear();
        info!("scan caches invalidated");
    }

    fn state(&self) -> MutexGuard<'_, ScanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs (or serves from cache) one scan.
    ///
    /// - `progress`: optional callback, rate-limited to the configured
    ///   interval and always called once on completion.
    /// - `cancel`: optional flag checked between batches and while waiting
    ///   on the pool. Cancellation leaves every cache untouched.
    pub fn scan(
        &self,
        request: &ScanRequest,
        progress: Option<&dyn Fn(&ScanProgress)>,
        cancel: Option<&AtomicBool>,
    ) -> Result<ScanReport, ScanError> {
        let Some(_guard) = ScanGuard::acquire(&self.scanning) else {
            warn!("scan rejected: another scan is in progress");
            return Err(ScanError::InProgress);
        };

        let started = Instant::now();
        let trace = RefCell::new(PassTrace::default());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_pass(request, progress, cancel, &trace, started)
        }));

        match outcome {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(ScanError::Unavailable(reason))) => self.fall_back(reason),
            Ok(Err(e)) => {
                if matches!(e, ScanError::Cancelled) {
                    info!(elapsed_ms = started.elapsed().as_millis() as u64, "scan cancelled");
                }
                Err(e)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                let trace = trace.into_inner();
                error!(
                    signature = trace.signature.as_deref().unwrap_or("-"),
                    batch = ?trace.batch,
                    phase = ?trace.phase,
                    panic = %message,
                    "scan pass panicked"
                );
                self.fall_back(format!("internal error: {message}"))
            }
        }
    }

    fn fall_back(&self, reason: String) -> Result<ScanReport, ScanError> {
        match self.last_result() {
            Some(result) => {
                warn!(reason = %reason, generated_at = %result.generated_at, "scan failed, serving last good result");
                Ok(ScanReport {
                    result,
                    source: ResultSource::StaleFallback,
                })
            }
            None => {
                error!(reason = %reason, "scan failed with no previous result to fall back on");
                Err(ScanError::Unavailable(reason))
            }
        }
    }

    fn run_pass(
        &self,
        request: &ScanRequest,
        progress: Option<&dyn Fn(&ScanProgress)>,
        cancel: Option<&AtomicBool>,
        trace: &RefCell<PassTrace>,
        started: Instant,
    ) -> Result<ScanReport, ScanError> {
        let cfg = &self.config;
        let detectors: Arc<[SignalDefinition]> =
            self.registry.enabled(request.signal_ids.as_ref()).into();
        let signal_ids: BTreeSet<String> = detectors.iter().map(|d| d.id().to_string()).collect();
        let required =
            SignalRegistry::required_depth_with(&detectors, cfg.depth_margin, cfg.default_depth);
        let depth = required.max(cfg.min_window_len);

        let meta = self.store.latest_metadata()?;
        let signature = ScanSignature::new(&meta, depth, signal_ids.clone());
        trace.borrow_mut().signature = Some(signature.to_string());

        if !request.force {
            if let Some(hit) = self.state().results.get(&signature) {
                info!(signature = %signature, "result cache hit");
                return Ok(ScanReport {
                    result: hit,
                    source: ResultSource::Cached,
                });
            }
        }

        let plan = PassPlan {
            signature,
            detectors,
            gainers: Arc::new(GainerSpec {
                periods: cfg.gainer_periods.clone(),
                limit_up_pct: cfg.limit_up_pct,
            }),
            depth,
            cancel,
            trace,
        };
        plan.check_cancel()?;

        let universe = self.resolve_universe()?;
        let strategy = if universe.len() >= cfg.streaming_threshold {
            ScanStrategy::Streaming
        } else {
            ScanStrategy::WholeBatch
        };
        info!(
            signature = %plan.signature,
            universe = universe.len(),
            signals = signal_ids.len(),
            depth,
            ?strategy,
            force = request.force,
            "scan started"
        );

        let mut acc = PassAccumulator {
            matches: signal_ids.iter().map(|id| (id.clone(), Vec::new())).collect(),
            gainers: GainerTracker::new(&cfg.gainer_periods, cfg.top_n),
            stats: ScanStats::new(universe.len(), strategy),
            load_failures: 0,
        };
        let mut throttle = ProgressThrottle::new(progress, cfg.progress_interval());

        let fresh_dataset = if universe.is_empty() {
            None
        } else {
            match strategy {
                ScanStrategy::Streaming => {
                    self.run_streaming(&plan, &universe, &mut acc, &mut throttle)?;
                    None
                }
                ScanStrategy::WholeBatch => {
                    self.run_whole_batch(&plan, &universe, &mut acc, &mut throttle)?
                }
            }
        };

        if acc.stats.batches_total > 0 && acc.load_failures == acc.stats.batches_total {
            return Err(ScanError::Unavailable(format!(
                "all {} batch loads failed",
                acc.stats.batches_total
            )));
        }

        throttle.finish(universe.len());
        acc.stats.elapsed_ms = started.elapsed().as_millis() as u64;
        let result = Arc::new(ScanResult {
            signature: plan.signature.clone(),
            signals: acc.matches,
            top_gainers: acc.gainers.finish(),
            stats: acc.stats,
            generated_at: Utc::now(),
        });

        if let Some((key, dataset)) = fresh_dataset {
            self.data.put(key, dataset);
        }
        let mut state = self.state();
        state.results.put(Arc::clone(&result));
        state.last_good = Some(Arc::clone(&result));
        drop(state);

        info!(
            signature = %result.signature,
            matches = result.total_matches(),
            evaluated = result.stats.symbols_evaluated,
            skipped_batches = result.stats.batches_skipped,
            detector_errors = result.stats.detector_errors,
            elapsed_ms = result.stats.elapsed_ms,
            "scan finished"
        );
        Ok(ScanReport {
            result,
            source: ResultSource::Computed,
        })
    }

    /// Eligible codes that pass the market filter, sorted and unique.
    fn resolve_universe(&self) -> Result<Vec<String>, ScanError> {
        let mut codes: Vec<String> = self
            .store
            .list_eligible_symbols(self.config.freshness_days)?
            .into_iter()
            .filter(|c| self.config.accepts_code(c))
            .collect();
        codes.sort();
        codes.dedup();
        Ok(codes)
    }

    fn run_streaming(
        &self,
        plan: &PassPlan<'_>,
        universe: &[String],
        acc: &mut PassAccumulator,
        throttle: &mut ProgressThrottle<'_>,
    ) -> Result<(), ScanError> {
        let total = universe.len();
        let mut processed = 0;
        for (index, chunk) in universe.chunks(self.config.batch_size).enumerate() {
            plan.check_cancel()?;
            acc.stats.batches_total += 1;
            plan.enter(index, ScanPhase::Loading);
            throttle.report(processed, total, ScanPhase::Loading);

            let loaded = match self.store.load_bars(chunk, plan.depth) {
                Ok(map) => map,
                Err(e) => {
                    warn!(batch = index, error = %e, "batch load failed, skipping");
                    acc.load_failures += 1;
                    acc.stats.batches_skipped += 1;
                    processed += chunk.len();
                    continue;
                }
            };
            let names = self.lookup_names(chunk);
            let windows = build_windows(chunk, loaded, &names, plan.depth);

            plan.enter(index, ScanPhase::Scanning);
            self.evaluate(plan, index, windows, acc)?;
            processed += chunk.len();
            throttle.report(processed, total, ScanPhase::Scanning);
        }
        Ok(())
    }

    /// Returns the freshly loaded dataset (to cache once the pass succeeds),
    /// or `None` when it came from the cache or a load failed.
    fn run_whole_batch(
        &self,
        plan: &PassPlan<'_>,
        universe: &[String],
        acc: &mut PassAccumulator,
        throttle: &mut ProgressThrottle<'_>,
    ) -> Result<Option<(DatasetKey, Arc<Dataset>)>, ScanError> {
        let total = universe.len();
        let batch_size = self.config.batch_size;
        let fingerprint = universe_fingerprint(universe, self.names.is_some());
        let key = plan.signature.dataset_key(self.config.depth_bucket, fingerprint);

        let cached = self.data.get(&key).filter(|(dataset, tier)| {
            let missing = universe.iter().filter(|code| !dataset.contains(code)).count();
            if missing > 0 {
                warn!(?tier, missing, blob_key = %key.blob_key(), "cached dataset lacks universe symbols, reloading");
            }
            missing == 0
        });
        let (dataset, fresh) = match cached {
            Some((dataset, tier)) => {
                info!(?tier, blob_key = %key.blob_key(), "dataset cache hit");
                acc.stats.dataset_cache = Some(tier);
                (dataset, false)
            }
            None => {
                debug!(blob_key = %key.blob_key(), depth = key.depth, "dataset cache miss, loading");
                let mut dataset = Dataset::new();
                let mut complete = true;
                for (index, chunk) in universe.chunks(batch_size).enumerate() {
                    plan.check_cancel()?;
                    plan.enter(index, ScanPhase::Loading);
                    throttle.report(index * batch_size, total, ScanPhase::Loading);
                    match self.store.load_bars(chunk, key.depth) {
                        Ok(loaded) => {
                            let names = self.lookup_names(chunk);
                            dataset.absorb(build_windows(chunk, loaded, &names, key.depth));
                        }
                        Err(e) => {
                            warn!(batch = index, error = %e, "batch load failed, skipping");
                            acc.load_failures += 1;
                            complete = false;
                        }
                    }
                }
                (Arc::new(dataset), complete)
            }
        };

        let mut processed = 0;
        for (index, chunk) in universe.chunks(batch_size).enumerate() {
            plan.check_cancel()?;
            acc.stats.batches_total += 1;
            plan.enter(index, ScanPhase::Scanning);
            let present: Vec<&SeriesWindow> =
                chunk.iter().filter_map(|code| dataset.get(code)).collect();
            if present.is_empty() && acc.load_failures > 0 {
                acc.stats.batches_skipped += 1;
                processed += chunk.len();
                continue;
            }
            let windows: Dataset = present
                .into_iter()
                .map(|w| SeriesWindow::new(w.symbol.clone(), w.recent(plan.depth).to_vec(), plan.depth))
                .collect();
            self.evaluate(plan, index, windows, acc)?;
            processed += chunk.len();
            throttle.report(processed, total, ScanPhase::Scanning);
        }

        Ok(fresh.then_some((key, dataset)))
    }

    /// Filters short windows, dispatches one batch and folds its outcome in.
    fn evaluate(
        &self,
        plan: &PassPlan<'_>,
        index: usize,
        windows: Dataset,
        acc: &mut PassAccumulator,
    ) -> Result<(), ScanError> {
        let min_len = self.config.min_window_len;
        let mut eligible = Vec::with_capacity(windows.len());
        for window in windows.windows() {
            if window.len() >= min_len {
                eligible.push(window.clone());
            } else {
                acc.stats.windows_too_short += 1;
            }
        }
        if eligible.is_empty() {
            return Ok(());
        }

        let rx = self.pool.dispatch(BatchJob {
            index,
            windows: Arc::new(eligible),
            detectors: Arc::clone(&plan.detectors),
            gainers: Arc::clone(&plan.gainers),
        });
        match self.await_batch(&rx, index, plan)? {
            Some(outcome) => acc.absorb(outcome),
            None => acc.stats.batches_skipped += 1,
        }
        Ok(())
    }

    /// Waits for one batch in short slices so cancellation is noticed.
    /// `None` means the batch timed out or its job died.
    fn await_batch(
        &self,
        rx: &Receiver<BatchOutcome>,
        index: usize,
        plan: &PassPlan<'_>,
    ) -> Result<Option<BatchOutcome>, ScanError> {
        let timeout = self.config.batch_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            plan.check_cancel()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(batch = index, timeout_ms = timeout.as_millis() as u64, "batch timed out, skipping");
                return Ok(None);
            }
            match rx.recv_timeout(remaining.min(POLL_SLICE)) {
                Ok(outcome) => return Ok(Some(outcome)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(batch = index, "batch job died, skipping");
                    return Ok(None);
                }
            }
        }
    }

    /// Display names for a batch; failures fall back to codes.
    fn lookup_names(&self, codes: &[String]) -> HashMap<String, String> {
        let Some(names) = &self.names else {
            return HashMap::new();
        };
        names.display_names(codes).unwrap_or_else(|e| {
            warn!(error = %e, "name lookup failed, using codes");
            HashMap::new()
        })
    }
}

fn build_windows(
    chunk: &[String],
    mut loaded: HashMap<String, Vec<Bar>>,
    names: &HashMap<String, String>,
    depth: usize,
) -> Dataset {
    chunk
        .iter()
        .filter_map(|code| {
            let bars = loaded.remove(code)?;
            let symbol = match names.get(code) {
                Some(name) => Symbol::new(code.clone(), name.clone()),
                None => Symbol::from_code(code.clone()),
            };
            Some(SeriesWindow::from_descending(symbol, bars, depth))
        })
        .filter(|w| !w.is_empty())
        .collect()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
