//! Process-wide readiness signal
//!
//! Asserted when a pass completes with nothing blocking upgrades, retracted
//! when a component marks the cluster not upgradeable. Served at `/readyz`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Readiness {
    ready: Arc<AtomicBool>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.ready.store(true, Ordering::Relaxed);
    }

    pub fn unset(&self) {
        self.ready.store(false, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}
