//! NopHandler - discards everything

use async_trait::async_trait;

use contracts::{Context, DispatchHandler, Event, Metric, MetricMap};

/// Handler with no observable effect, used to stub out pipeline stages
#[derive(Debug, Clone, Copy, Default)]
pub struct NopHandler;

#[async_trait]
impl DispatchHandler for NopHandler {
    fn estimated_tags(&self) -> usize {
        0
    }

    fn dispatch_metrics(&self, _ctx: &Context, _metrics: Vec<Metric>) {}

    fn dispatch_metric_map(&self, _ctx: &Context, _mm: MetricMap) {}

    fn dispatch_event(&self, _ctx: &Context, _event: Event) {}

    async fn wait_for_events(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_nop_never_blocks() {
        let handler: Arc<dyn DispatchHandler> = Arc::new(NopHandler);
        let ctx = Context::new();

        handler.dispatch_metrics(&ctx, vec![Metric::counter("a", 1.0)]);
        handler.dispatch_metric_map(&ctx, MetricMap::new());
        handler.dispatch_event(&ctx, Event::new("e", ""));

        assert_eq!(handler.estimated_tags(), 0);
        timeout(Duration::from_millis(100), handler.wait_for_events())
            .await
            .expect("wait_for_events blocked");
    }
}
