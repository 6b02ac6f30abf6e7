//! LogHandler - logs dispatch summaries via tracing

use async_trait::async_trait;
use tracing::{info, instrument};

use contracts::{Context, DispatchHandler, Event, Metric, MetricMap};

/// Handler that logs what it receives, for debugging
pub struct LogHandler {
    name: String,
    estimated_tags: usize,
}

impl LogHandler {
    /// Create a new LogHandler with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            estimated_tags: 0,
        }
    }

    pub fn with_estimated_tags(mut self, estimated_tags: usize) -> Self {
        self.estimated_tags = estimated_tags;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl DispatchHandler for LogHandler {
    fn estimated_tags(&self) -> usize {
        self.estimated_tags
    }

    #[instrument(
        name = "log_handler_metrics",
        skip(self, _ctx, metrics),
        fields(handler = %self.name, count = metrics.len())
    )]
    fn dispatch_metrics(&self, _ctx: &Context, metrics: Vec<Metric>) {
        for mut m in metrics {
            info!(
                handler = %self.name,
                name = %m.name,
                metric_type = %m.metric_type,
                value = m.value,
                tags = %m.tags_key(),
                "Metric received"
            );
            m.done();
        }
    }

    #[instrument(
        name = "log_handler_metric_map",
        skip(self, _ctx, mm),
        fields(handler = %self.name, series = mm.len())
    )]
    fn dispatch_metric_map(&self, _ctx: &Context, mm: MetricMap) {
        info!(
            handler = %self.name,
            counters = mm.counters.len(),
            gauges = mm.gauges.len(),
            timers = mm.timers.len(),
            sets = mm.sets.len(),
            "MetricMap received"
        );
    }

    fn dispatch_event(&self, _ctx: &Context, event: Event) {
        info!(
            handler = %self.name,
            title = %event.title,
            alert_type = ?event.alert_type,
            hostname = %event.hostname,
            "Event received"
        );
    }

    async fn wait_for_events(&self) {
        // Nothing is buffered
    }
}
