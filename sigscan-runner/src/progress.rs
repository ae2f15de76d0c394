//! Scan progress reporting with rate limiting.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Loading,
    Scanning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub processed: usize,
    pub total: usize,
    pub phase: ScanPhase,
}

/// Forwards progress to an optional callback at most once per interval.
/// The first update and `finish` always go through.
pub struct ProgressThrottle<'a> {
    callback: Option<&'a dyn Fn(&ScanProgress)>,
    interval: Duration,
    last_emit: Option<Instant>,
}

impl<'a> ProgressThrottle<'a> {
    pub fn new(callback: Option<&'a dyn Fn(&ScanProgress)>, interval: Duration) -> Self {
        Self {
            callback,
            interval,
            last_emit: None,
        }
    }

    pub fn report(&mut self, processed: usize, total: usize, phase: ScanPhase) {
        let due = self
            .last_emit
            .map_or(true, |t| t.elapsed() >= self.interval);
        if due {
            self.emit(ScanProgress {
                processed,
                total,
                phase,
            });
        }
    }

    pub fn finish(&mut self, total: usize) {
        self.emit(ScanProgress {
            processed: total,
            total,
            phase: ScanPhase::Scanning,
        });
    }

    fn emit(&mut self, progress: ScanProgress) {
        if let Some(cb) = self.callback {
            cb(&progress);
            self.last_emit = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn throttles_between_first_and_finish() {
        let seen = RefCell::new(Vec::new());
        let cb = |p: &ScanProgress| seen.borrow_mut().push(*p);
        let mut throttle = ProgressThrottle::new(Some(&cb), Duration::from_secs(3600));
        throttle.report(0, 10, ScanPhase::Loading);
        throttle.report(5, 10, ScanPhase::Scanning);
        throttle.finish(10);
        let seen = seen.into_inner();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].phase, ScanPhase::Loading);
        assert_eq!(seen[1].processed, 10);
    }

    #[test]
    fn zero_interval_emits_every_update() {
        let count = RefCell::new(0);
        let cb = |_: &ScanProgress| *count.borrow_mut() += 1;
        let mut throttle = ProgressThrottle::new(Some(&cb), Duration::ZERO);
        for i in 0..5 {
            throttle.report(i, 5, ScanPhase::Scanning);
        }
        assert_eq!(count.into_inner(), 5);
    }

    #[test]
    fn no_callback_is_a_no_op() {
        let mut throttle = ProgressThrottle::new(None, Duration::ZERO);
        throttle.report(1, 2, ScanPhase::Loading);
        throttle.finish(2);
    }
}
