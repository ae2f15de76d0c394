//! Single-slot cache of the latest successful scan result.

use std::sync::Arc;

use crate::result::ScanResult;
use crate::signature::ScanSignature;

#[derive(Debug, Default)]
pub struct ResultCache {
    slot: Option<Arc<ScanResult>>,
}

impl ResultCache {
    /// Served only on an exact signature match, signal set included.
    pub fn get(&self, signature: &ScanSignature) -> Option<Arc<ScanResult>> {
        self.slot
            .as_ref()
            .filter(|r| r.signature == *signature)
            .map(Arc::clone)
    }

    pub fn put(&mut self, result: Arc<ScanResult>) {
        self.slot = Some(result);
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}
