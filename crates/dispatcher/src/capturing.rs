//! CapturingHandler - keeps every dispatched entity for later inspection

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::trace;

use contracts::{Context, DispatchHandler, DoneFunc, Event, Events, Metric, MetricMap};

#[derive(Debug, Default)]
struct Captured {
    metrics: Vec<Metric>,
    metric_maps: Vec<MetricMap>,
    events: Events,
}

/// Handler that accumulates metrics and events in memory
///
/// Completion callbacks are cleared before storage so captured metrics
/// compare deterministically. Metric maps are kept as received and also
/// flattened into the same store as individual metrics.
#[derive(Debug, Default)]
pub struct CapturingHandler {
    captured: Mutex<Captured>,
    estimated_tags: usize,
    acknowledge: bool,
}

impl CapturingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke each metric's callback before clearing it
    pub fn acknowledging() -> Self {
        Self {
            acknowledge: true,
            ..Self::default()
        }
    }

    pub fn with_estimated_tags(mut self, estimated_tags: usize) -> Self {
        self.estimated_tags = estimated_tags;
        self
    }

    /// Copy of all captured metrics, in dispatch order
    pub fn metrics(&self) -> Vec<Metric> {
        self.lock().metrics.clone()
    }

    /// Copy of all captured metric maps, as received
    pub fn metric_maps(&self) -> Vec<MetricMap> {
        self.lock().metric_maps.clone()
    }

    /// Copy of all captured events, in dispatch order
    pub fn events(&self) -> Events {
        self.lock().events.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Captured> {
        // Storage stays consistent even if a holder panicked mid-append
        self.captured
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_metrics(&self, mut metrics: Vec<Metric>, map: Option<MetricMap>) {
        let callbacks: Vec<DoneFunc> = metrics.iter_mut().filter_map(|m| m.done.take()).collect();

        {
            let mut captured = self.lock();
            captured.metrics.extend(metrics);
            captured.metric_maps.extend(map);
            trace!(total = captured.metrics.len(), "Metrics captured");
        }

        // Callbacks run after the lock is released
        if self.acknowledge {
            for done in callbacks {
                done();
            }
        }
    }
}

#[async_trait]
impl DispatchHandler for CapturingHandler {
    fn estimated_tags(&self) -> usize {
        self.estimated_tags
    }

    fn dispatch_metrics(&self, _ctx: &Context, metrics: Vec<Metric>) {
        self.record_metrics(metrics, None);
    }

    fn dispatch_metric_map(&self, _ctx: &Context, mm: MetricMap) {
        self.record_metrics(mm.as_metrics(), Some(mm));
    }

    fn dispatch_event(&self, _ctx: &Context, event: Event) {
        self.lock().events.push(event);
    }

    async fn wait_for_events(&self) {}
}
