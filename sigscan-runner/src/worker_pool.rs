//! Bounded worker pool for detector evaluation.
//!
//! A private rayon pool (not the global one) with named threads. One job is
//! "run every enabled detector over one batch"; inside the job the batch is
//! split across the pool's threads. Detector errors and panics are caught per
//! symbol per detector, counted and skipped.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use rayon::prelude::*;
use sigscan_core::{Metrics, SeriesWindow, SignalDefinition};
use tracing::{debug, error, warn};

use crate::gainers::{GainerSample, GainerSpec};

/// One batch of work. Windows are shared, never copied into the pool.
pub struct BatchJob {
    pub index: usize,
    pub windows: Arc<Vec<SeriesWindow>>,
    pub detectors: Arc<[SignalDefinition]>,
    pub gainers: Arc<GainerSpec>,
}

/// A triggered detector for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    pub code: String,
    pub name: String,
    pub metrics: Metrics,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub index: usize,
    /// Matches per signal id, in window order.
    pub matches: BTreeMap<String, Vec<RawMatch>>,
    pub gainer_samples: Vec<GainerSample>,
    pub symbols_evaluated: usize,
    pub detector_errors: usize,
}

#[derive(Default)]
struct WindowOutcome {
    hits: Vec<(usize, RawMatch)>,
    gainers: Vec<GainerSample>,
    errors: usize,
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sigscan-worker-{i}"))
            .panic_handler(|_| error!("panic escaped a scan job"))
            .build()?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queues a job and returns the channel its outcome arrives on. If the
    /// job dies the sender is dropped and the receiver sees a disconnect.
    pub fn dispatch(&self, job: BatchJob) -> Receiver<BatchOutcome> {
        let (tx, rx) = mpsc::channel();
        self.pool.spawn(move || {
            let index = job.index;
            match panic::catch_unwind(AssertUnwindSafe(|| evaluate_batch(&job))) {
                Ok(outcome) => {
                    // Receiver gone means the batch timed out; drop the result.
                    if tx.send(outcome).is_err() {
                        debug!(batch = index, "late batch result dropped");
                    }
                }
                Err(_) => error!(batch = index, "batch evaluation panicked"),
            }
        });
        rx
    }
}

/// Runs every detector over every window of the batch on the current pool.
pub fn evaluate_batch(job: &BatchJob) -> BatchOutcome {
    let per_window: Vec<WindowOutcome> = job
        .windows
        .par_iter()
        .map(|window| evaluate_window(window, &job.detectors, &job.gainers))
        .collect();

    let mut outcome = BatchOutcome {
        index: job.index,
        symbols_evaluated: job.windows.len(),
        ..Default::default()
    };
    for def in job.detectors.iter() {
        outcome.matches.insert(def.id().to_string(), Vec::new());
    }
    for w in per_window {
        outcome.detector_errors += w.errors;
        outcome.gainer_samples.extend(w.gainers);
        for (det_idx, hit) in w.hits {
            let id = job.detectors[det_idx].id();
            outcome.matches.entry(id.to_string()).or_default().push(hit);
        }
    }
    outcome
}

fn evaluate_window(
    window: &SeriesWindow,
    detectors: &[SignalDefinition],
    gainers: &GainerSpec,
) -> WindowOutcome {
    let mut out = WindowOutcome::default();
    for (idx, def) in detectors.iter().enumerate() {
        if !def.accepts_len(window.len()) {
            continue;
        }
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            def.detect(window.bars(), &window.symbol)
        }));
        match result {
            Ok(Ok(outcome)) if outcome.triggered => out.hits.push((
                idx,
                RawMatch {
                    code: window.symbol.code.clone(),
                    name: window.symbol.display_name.clone(),
                    metrics: outcome.metrics,
                },
            )),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                debug!(signal = def.id(), code = window.code(), error = %e, "detector failed");
                out.errors += 1;
            }
            Err(_) => {
                warn!(signal = def.id(), code = window.code(), "detector panicked");
                out.errors += 1;
            }
        }
    }
    out.gainers = gainers.sample(window);
    out
}
