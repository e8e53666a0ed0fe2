//! Metrics collection for observability
//!
//! Prometheus metrics on a private registry, one per [`crate::Books`].
//!
//! # Metrics
//!
//! - `books_invoices_posted_total` - Invoices posted or re-posted
//! - `books_invoices_deleted_total` - Invoices deleted
//! - `books_posting_warnings_total` - Skipped lines and references
//! - `books_transfers_total` - Balance transfers
//! - `books_treasury_entries_total` - Manual cash entries
//! - `books_persist_duration_seconds` - Histogram of snapshot write latencies
//! - `books_snapshot_size_bytes` - Size of the last persisted snapshot

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Invoices posted
    pub invoices_posted: IntCounter,

    /// Invoices deleted
    pub invoices_deleted: IntCounter,

    /// Posting warnings
    pub posting_warnings: IntCounter,

    /// Balance transfers
    pub transfers: IntCounter,

    /// Manual treasury entries
    pub treasury_entries: IntCounter,

    /// Persist duration histogram
    pub persist_duration: Histogram,

    /// Last snapshot size
    pub snapshot_size: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let invoices_posted = IntCounter::new(
            "books_invoices_posted_total",
            "Invoices posted or re-posted",
        )?;
        registry.register(Box::new(invoices_posted.clone()))?;

        let invoices_deleted =
            IntCounter::new("books_invoices_deleted_total", "Invoices deleted")?;
        registry.register(Box::new(invoices_deleted.clone()))?;

        let posting_warnings = IntCounter::new(
            "books_posting_warnings_total",
            "Skipped lines and references during posting",
        )?;
        registry.register(Box::new(posting_warnings.clone()))?;

        let transfers = IntCounter::new("books_transfers_total", "Balance transfers")?;
        registry.register(Box::new(transfers.clone()))?;

        let treasury_entries =
            IntCounter::new("books_treasury_entries_total", "Manual cash entries")?;
        registry.register(Box::new(treasury_entries.clone()))?;

        let persist_duration = Histogram::with_opts(
            HistogramOpts::new(
                "books_persist_duration_seconds",
                "Histogram of snapshot write latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(persist_duration.clone()))?;

        let snapshot_size =
            IntGauge::new("books_snapshot_size_bytes", "Size of the last persisted snapshot")?;
        registry.register(Box::new(snapshot_size.clone()))?;

        Ok(Self {
            invoices_posted,
            invoices_deleted,
            posting_warnings,
            transfers,
            treasury_entries,
            persist_duration,
            snapshot_size,
            registry,
        })
    }

    /// Record a posted invoice and its warnings
    pub fn record_invoice_posted(&self, warnings: usize) {
        self.invoices_posted.inc();
        self.posting_warnings.inc_by(warnings as u64);
    }

    /// Record a deleted invoice and its warnings
    pub fn record_invoice_deleted(&self, warnings: usize) {
        self.invoices_deleted.inc();
        self.posting_warnings.inc_by(warnings as u64);
    }

    /// Record balance transfer
    pub fn record_transfer(&self) {
        self.transfers.inc();
    }

    /// Record manual treasury entry
    pub fn record_treasury_entry(&self) {
        self.treasury_entries.inc();
    }

    /// Record a snapshot write
    pub fn record_persist(&self, duration_seconds: f64, size_bytes: usize) {
        self.persist_duration.observe(duration_seconds);
        self.snapshot_size.set(size_bytes as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render in the Prometheus text format
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("invoices_posted", &self.invoices_posted.get())
            .field("transfers", &self.transfers.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.invoices_posted.get(), 0);
        assert_eq!(metrics.transfers.get(), 0);
    }

    #[test]
    fn test_two_collectors_do_not_collide() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_transfer();
        assert_eq!(a.transfers.get(), 1);
        assert_eq!(b.transfers.get(), 0);
    }

    #[test]
    fn test_record_invoice_posted() {
        let metrics = Metrics::new().unwrap();
        metrics.record_invoice_posted(0);
        metrics.record_invoice_posted(2);
        assert_eq!(metrics.invoices_posted.get(), 2);
        assert_eq!(metrics.posting_warnings.get(), 2);
    }

    #[test]
    fn test_record_persist() {
        let metrics = Metrics::new().unwrap();
        metrics.record_persist(0.002, 4096);
        assert_eq!(metrics.snapshot_size.get(), 4096);
        assert_eq!(metrics.persist_duration.get_sample_count(), 1);
    }

    #[test]
    fn test_render_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_treasury_entry();
        let text = metrics.render();
        assert!(text.contains("books_treasury_entries_total 1"));
    }
}
