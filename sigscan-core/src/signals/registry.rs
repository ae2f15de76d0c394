//! Signal registry: the set of detectors known to this process.
//!
//! Populated once at start-up (`with_builtin()` plus any custom detectors),
//! then enumerated per scan. Ordered by id so catalog order is deterministic.

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use super::builtin;
use super::SignalDefinition;

/// Extra bars loaded beyond the largest detector requirement.
pub const DEPTH_SAFETY_MARGIN: usize = 20;

/// Depth used when no detector is enabled (top-gainers still need history).
pub const DEFAULT_REQUIRED_DEPTH: usize = 150;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("signal '{0}' is already registered")]
    DuplicateSignal(String),

    #[error("unknown signal '{0}'")]
    UnknownSignal(String),
}

#[derive(Debug, Clone, Default)]
pub struct SignalRegistry {
    signals: BTreeMap<String, SignalDefinition>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in detector catalog.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for def in builtin::catalog() {
            // Built-in ids are unique by construction.
            let _ = registry.register(def);
        }
        registry
    }

    /// Add a detector. Fails if a detector with the same id already exists.
    pub fn register(&mut self, def: SignalDefinition) -> Result<(), RegistryError> {
        let id = def.id().to_string();
        if self.signals.contains_key(&id) {
            return Err(RegistryError::DuplicateSignal(id));
        }
        self.signals.insert(id, def);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&SignalDefinition> {
        self.signals.get(id)
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), RegistryError> {
        let def = self
            .signals
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownSignal(id.to_string()))?;
        def.enabled = enabled;
        Ok(())
    }

    /// Switch off every listed detector. Unknown ids are skipped and
    /// returned so the caller can report them.
    pub fn apply_disabled(&mut self, ids: &[String]) -> Vec<String> {
        ids.iter()
            .filter(|id| self.set_enabled(id, false).is_err())
            .cloned()
            .collect()
    }

    /// Enabled detectors, optionally intersected with `filter`.
    ///
    /// Ids in the filter that are unknown or disabled are ignored.
    pub fn enabled(&self, filter: Option<&BTreeSet<String>>) -> Vec<SignalDefinition> {
        self.signals
            .values()
            .filter(|def| def.enabled)
            .filter(|def| filter.map_or(true, |f| f.contains(def.id())))
            .cloned()
            .collect()
    }

    /// Bars to load for `defs`: largest `min_bars` plus [`DEPTH_SAFETY_MARGIN`].
    pub fn required_depth(defs: &[SignalDefinition]) -> usize {
        Self::required_depth_with(defs, DEPTH_SAFETY_MARGIN, DEFAULT_REQUIRED_DEPTH)
    }

    /// Same as [`required_depth`](Self::required_depth) with explicit margin and fallback.
    pub fn required_depth_with(defs: &[SignalDefinition], margin: usize, fallback: usize) -> usize {
        defs.iter()
            .map(|d| d.min_bars())
            .max()
            .map_or(fallback, |max| max + margin)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.signals.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalDefinition> {
        self.signals.values()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}
