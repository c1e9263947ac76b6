//! # Prometheus Metrics
//!
//! Counters and gauges for a simulation run. All metrics live in a dedicated
//! [`prometheus::Registry`] under the `shareledger` namespace and are dumped
//! in text exposition format when `simulate --metrics` is given.

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Holds all Prometheus metric handles for one run.
#[derive(Clone)]
pub struct LedgerMetrics {
    registry: Registry,
    /// Successful operations, labelled by operation name.
    pub operations_total: IntCounterVec,
    /// Rejected operations, labelled by operation name and error kind.
    pub rejections_total: IntCounterVec,
    /// Shares outstanding after the last step.
    pub total_shares: IntGauge,
    /// Pooled value (or vault assets) after the last step.
    pub total_value: IntGauge,
}

impl LedgerMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("shareledger".into()), None)?;

        let operations_total = IntCounterVec::new(
            Opts::new("operations_total", "Ledger operations applied"),
            &["operation"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Ledger operations rejected, by error kind"),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let total_shares = IntGauge::new("total_shares", "Shares outstanding")?;
        registry.register(Box::new(total_shares.clone()))?;

        let total_value = IntGauge::new("total_value", "Pooled value or vault assets")?;
        registry.register(Box::new(total_value.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            rejections_total,
            total_shares,
            total_value,
        })
    }

    pub fn record_applied(&self, operation: &str) {
        self.operations_total.with_label_values(&[operation]).inc();
    }

    pub fn record_rejected(&self, operation: &str, kind: &str) {
        self.rejections_total
            .with_label_values(&[operation, kind])
            .inc();
    }

    /// Updates both gauges. Values past `i64::MAX` are clamped.
    pub fn set_totals(&self, shares: u64, value: u64) {
        self.total_shares.set(clamp(shares));
        self.total_value.set(clamp(value));
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
