// Private module declaration
mod exporter;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::time::Duration;

// Re-export for public API
pub use exporter::metrics_handler;

// ============================================================================
// Metrics Module - Prometheus metrics for the customer service
// ============================================================================
//
// Tracks:
// - Requests per operation and outcome, with latency
// - Version conflicts hit by the read-decide-write cycle
// - Credit decisions (created, limit_changed, accepted, rejected)
// - Requests carrying unknown fields
//
// All metrics are registered with one registry, scraped via GET /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub requests_total: IntCounterVec,
    pub request_duration: HistogramVec,
    pub version_conflicts: IntCounterVec,
    pub decisions_total: IntCounterVec,
    pub unknown_fields_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("customer_requests_total", "Total customer API requests"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new("customer_request_duration_seconds", "Customer API request duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0]),
            &["operation"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let version_conflicts = IntCounterVec::new(
            Opts::new(
                "customer_version_conflicts_total",
                "Writes rejected because the record changed since it was read",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(version_conflicts.clone()))?;

        let decisions_total = IntCounterVec::new(
            Opts::new("customer_decisions_total", "Account decisions by kind"),
            &["decision"],
        )?;
        registry.register(Box::new(decisions_total.clone()))?;

        let unknown_fields_total = IntCounterVec::new(
            Opts::new(
                "customer_unknown_fields_total",
                "Requests that carried fields the endpoint does not know",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(unknown_fields_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            version_conflicts,
            decisions_total,
            unknown_fields_total,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_request(&self, operation: &str, outcome: &str, elapsed: Duration) {
        self.requests_total.with_label_values(&[operation, outcome]).inc();
        self.request_duration
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_conflicts(&self, operation: &str, conflicts: u32) {
        if conflicts > 0 {
            self.version_conflicts
                .with_label_values(&[operation])
                .inc_by(u64::from(conflicts));
        }
    }

    pub fn record_decision(&self, decision: &str) {
        self.decisions_total.with_label_values(&[decision]).inc();
    }

    pub fn record_unknown_fields(&self, operation: &str) {
        self.unknown_fields_total.with_label_values(&[operation]).inc();
    }
}
