//! # Metrics
//!
//! Prometheus metrics for reconcile passes.
//!
//! ## Metrics Exposed
//!
//! - `storagecluster_reconcile_total{result}` - Passes by outcome (`success`, `error`)
//! - `storagecluster_reconcile_duration_seconds` - Wall time of a pass
//! - `storagecluster_storageclass_recreations_total` - Storage classes deleted and recreated on drift

use crate::error::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Reconcile metrics on a registry of their own
#[derive(Clone)]
pub struct ReconcileMetrics {
    registry: Registry,
    reconciles: IntCounterVec,
    duration: Histogram,
    recreations: IntCounter,
}

impl ReconcileMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let reconciles = IntCounterVec::new(
            Opts::new("storagecluster_reconcile_total", "Total number of reconcile passes"),
            &["result"],
        )?;
        let duration = Histogram::with_opts(
            HistogramOpts::new(
                "storagecluster_reconcile_duration_seconds",
                "Duration of reconcile passes in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        )?;
        let recreations = IntCounter::new(
            "storagecluster_storageclass_recreations_total",
            "Storage classes deleted and recreated because their parameters changed",
        )?;

        registry.register(Box::new(reconciles.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(recreations.clone()))?;

        Ok(Self {
            registry,
            reconciles,
            duration,
            recreations,
        })
    }

    /// Record one finished pass
    pub fn observe(&self, success: bool, elapsed: Duration, recreated_classes: u64) {
        let result = if success { "success" } else { "error" };
        self.reconciles.with_label_values(&[result]).inc();
        self.duration.observe(elapsed.as_secs_f64());
        self.recreations.inc_by(recreated_classes);
    }

    pub fn reconciles(&self, result: &str) -> u64 {
        self.reconciles.with_label_values(&[result]).get()
    }

    pub fn recreations(&self) -> u64 {
        self.recreations.get()
    }

    /// Text exposition of every metric in the registry
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_and_encode() {
        let metrics = ReconcileMetrics::new().unwrap();
        metrics.observe(true, Duration::from_millis(120), 0);
        metrics.observe(false, Duration::from_millis(30), 2);

        assert_eq!(metrics.reconciles("success"), 1);
        assert_eq!(metrics.reconciles("error"), 1);
        assert_eq!(metrics.recreations(), 2);

        let text = String::from_utf8(metrics.encode().unwrap()).unwrap();
        assert!(text.contains("storagecluster_reconcile_total{result=\"success\"} 1"));
        assert!(text.contains("storagecluster_storageclass_recreations_total 2"));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = ReconcileMetrics::new().unwrap();
        let b = ReconcileMetrics::new().unwrap();
        a.observe(true, Duration::ZERO, 0);
        assert_eq!(b.reconciles("success"), 0);
    }
}
