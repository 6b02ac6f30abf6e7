//! Forwarder metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single forwarder
#[derive(Debug, Default)]
pub struct HandlerMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Individual metrics handed downstream
    metrics_forwarded: AtomicU64,
    /// Metric maps handed downstream
    maps_forwarded: AtomicU64,
    /// Events handed downstream
    events_forwarded: AtomicU64,
    /// Dispatches dropped due to full queue
    dropped_count: AtomicU64,
    /// Dispatches skipped because their context was cancelled
    cancelled_count: AtomicU64,
}

impl HandlerMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn metrics_forwarded(&self) -> u64 {
        self.metrics_forwarded.load(Ordering::Relaxed)
    }

    pub fn add_metrics_forwarded(&self, n: u64) {
        self.metrics_forwarded.fetch_add(n, Ordering::Relaxed);
    }

    pub fn maps_forwarded(&self) -> u64 {
        self.maps_forwarded.load(Ordering::Relaxed)
    }

    pub fn inc_maps_forwarded(&self) {
        self.maps_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_forwarded(&self) -> u64 {
        self.events_forwarded.load(Ordering::Relaxed)
    }

    pub fn inc_events_forwarded(&self) {
        self.events_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cancelled_count(&self) -> u64 {
        self.cancelled_count.load(Ordering::Relaxed)
    }

    pub fn inc_cancelled_count(&self) {
        self.cancelled_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            metrics_forwarded: self.metrics_forwarded(),
            maps_forwarded: self.maps_forwarded(),
            events_forwarded: self.events_forwarded(),
            dropped_count: self.dropped_count(),
            cancelled_count: self.cancelled_count(),
        }
    }
}

/// Snapshot of forwarder metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub metrics_forwarded: u64,
    pub maps_forwarded: u64,
    pub events_forwarded: u64,
    pub dropped_count: u64,
    pub cancelled_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let metrics = HandlerMetrics::new();
        metrics.add_metrics_forwarded(3);
        metrics.inc_events_forwarded();
        metrics.inc_dropped_count();
        metrics.set_queue_len(7);

        let snap = metrics.snapshot();
        assert_eq!(snap.metrics_forwarded, 3);
        assert_eq!(snap.events_forwarded, 1);
        assert_eq!(snap.maps_forwarded, 0);
        assert_eq!(snap.dropped_count, 1);
        assert_eq!(snap.queue_len, 7);
    }
}
