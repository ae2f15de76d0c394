//! Signal detection: pluggable pattern detectors over a symbol's recent bars.
//!
//! Detectors are stateless: they receive the trailing bar window of one symbol
//! and report whether their pattern is present right now, with a few metrics
//! for display. They never see the store, the caches or other symbols.

pub mod builtin;
pub mod registry;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{Bar, Symbol};

pub use registry::{RegistryError, SignalRegistry, DEFAULT_REQUIRED_DEPTH, DEPTH_SAFETY_MARGIN};

/// A metric value attached to a signal outcome: a number (score, ratio) or a display suffix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v:.2}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Metrics keyed by name. `BTreeMap` keeps serialization order deterministic.
pub type Metrics = BTreeMap<String, MetricValue>;

/// Result of running one detector against one window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalOutcome {
    pub triggered: bool,
    pub metrics: Metrics,
}

impl SignalOutcome {
    /// Pattern not present.
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Pattern present, no metrics yet.
    pub fn hit() -> Self {
        Self {
            triggered: true,
            metrics: Metrics::new(),
        }
    }

    pub fn with_metric(mut self, key: &str, value: impl Into<MetricValue>) -> Self {
        self.metrics.insert(key.to_string(), value.into());
        self
    }
}

/// Errors a detector may report for a single window.
///
/// The scanner counts these per symbol per detector and moves on; they never
/// abort a batch.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("not enough bars: need {needed}, have {have}")]
    InsufficientBars { needed: usize, have: usize },

    #[error("invalid bar data: {0}")]
    InvalidData(String),

    #[error("detector failed: {0}")]
    Other(String),
}

/// Trait for signal detectors.
///
/// # Contract
/// `detect` must be pure: same window in, same outcome out, no side effects.
/// The scanner only calls it with windows of at least `min_bars()` bars.
pub trait SignalDetector: Send + Sync {
    /// Stable identifier (e.g., "macd_golden_cross").
    fn id(&self) -> &str;

    /// Human-readable name for presentation layers.
    fn display_name(&self) -> &str;

    /// Short glyph shown next to the name. Empty by default.
    fn icon(&self) -> &str {
        ""
    }

    /// Minimum window length this detector needs.
    fn min_bars(&self) -> usize;

    /// Evaluate the pattern on the last bar of `window` (ascending by date).
    fn detect(&self, window: &[Bar], symbol: &Symbol) -> Result<SignalOutcome, DetectError>;
}

/// A registered detector plus its enabled flag.
///
/// Cheap to clone: the detector itself is shared behind an `Arc`.
#[derive(Clone)]
pub struct SignalDefinition {
    detector: Arc<dyn SignalDetector>,
    pub enabled: bool,
}

impl SignalDefinition {
    pub fn new(detector: impl SignalDetector + 'static) -> Self {
        Self::from_arc(Arc::new(detector))
    }

    pub fn from_arc(detector: Arc<dyn SignalDetector>) -> Self {
        Self {
            detector,
            enabled: true,
        }
    }

    /// Same definition, registered but switched off.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn id(&self) -> &str {
        self.detector.id()
    }

    pub fn display_name(&self) -> &str {
        self.detector.display_name()
    }

    pub fn icon(&self) -> &str {
        self.detector.icon()
    }

    pub fn min_bars(&self) -> usize {
        self.detector.min_bars()
    }

    /// True if a window of `len` bars is long enough for this detector.
    pub fn accepts_len(&self, len: usize) -> bool {
        len >= self.min_bars()
    }

    pub fn detect(&self, window: &[Bar], symbol: &Symbol) -> Result<SignalOutcome, DetectError> {
        self.detector.detect(window, symbol)
    }
}

impl fmt::Debug for SignalDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalDefinition")
            .field("id", &self.id())
            .field("min_bars", &self.min_bars())
            .field("enabled", &self.enabled)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::NullDetector;
    use super::*;

    #[test]
    fn outcome_builder_collects_metrics() {
        let out = SignalOutcome::hit()
            .with_metric("score", 3.5)
            .with_metric("suffix", "2x");
        assert!(out.triggered);
        assert_eq!(out.metrics["score"].as_f64(), Some(3.5));
        assert_eq!(out.metrics["suffix"], MetricValue::Text("2x".into()));
    }

    #[test]
    fn metric_value_serializes_untagged() {
        let mut m = Metrics::new();
        m.insert("a".into(), MetricValue::Number(1.5));
        m.insert("b".into(), MetricValue::Text("x".into()));
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"a":1.5,"b":"x"}"#);
        let back: Metrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn definition_delegates_to_detector() {
        let def = SignalDefinition::new(NullDetector);
        assert_eq!(def.id(), "null");
        assert_eq!(def.min_bars(), 0);
        assert!(def.enabled);
        assert!(!def.clone().disabled().enabled);
        let out = def.detect(&[], &Symbol::from_code("000001")).unwrap();
        assert!(!out.triggered);
    }

    #[test]
    fn accepts_len_respects_min_bars() {
        let def = SignalDefinition::new(builtin::LimitUp::default());
        assert!(!def.accepts_len(1));
        assert!(def.accepts_len(2));
    }
}
