//! ExpectingHandler - capture plus "expect N, wait for N" synchronization

use async_trait::async_trait;
use tracing::debug;

use contracts::{Context, ContractError, DispatchHandler, Event, Events, Metric, MetricMap};

use crate::capturing::CapturingHandler;
use crate::countdown::Countdown;

/// Outstanding work per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outstanding {
    /// Individual metrics (not dispatch calls)
    pub metrics: u64,
    /// `dispatch_metric_map` calls
    pub metric_maps: u64,
    /// `dispatch_event` calls
    pub events: u64,
}

/// Handler that lets a caller block until a known amount of dispatch work
/// has landed.
///
/// Declare the work with [`expect`](Self::expect) before triggering it,
/// then await [`wait_all`](Self::wait_all). Storage is delegated to an inner
/// [`CapturingHandler`] so captured state can be inspected afterwards.
#[derive(Debug)]
pub struct ExpectingHandler {
    inner: CapturingHandler,
    metrics: Countdown,
    metric_maps: Countdown,
    events: Countdown,
}

impl Default for ExpectingHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpectingHandler {
    pub fn new() -> Self {
        Self::wrap(CapturingHandler::new())
    }

    /// Track completion around an existing capturing handler
    pub fn wrap(inner: CapturingHandler) -> Self {
        Self {
            inner,
            metrics: Countdown::new("metrics"),
            metric_maps: Countdown::new("metric_maps"),
            events: Countdown::new("events"),
        }
    }

    /// Expect `metrics` individual metrics, `metric_maps` map dispatches and
    /// `events` event dispatches.
    pub fn expect(&self, metrics: u64, metric_maps: u64, events: u64) {
        self.metrics.add(metrics);
        self.metric_maps.add(metric_maps);
        self.events.add(events);
        debug!(metrics, metric_maps, events, "Expecting dispatches");
    }

    /// Wait until every expected unit has been dispatched.
    ///
    /// # Errors
    /// Returns `CounterUnderflow` as soon as any category has received more
    /// work than was expected, even while other categories are outstanding.
    pub async fn wait_all(&self) -> Result<(), ContractError> {
        tokio::try_join!(
            self.metrics.wait(),
            self.metric_maps.wait(),
            self.events.wait()
        )?;
        Ok(())
    }

    pub fn outstanding(&self) -> Outstanding {
        Outstanding {
            metrics: self.metrics.outstanding(),
            metric_maps: self.metric_maps.outstanding(),
            events: self.events.outstanding(),
        }
    }

    /// Copy of all captured metrics
    pub fn metrics(&self) -> Vec<Metric> {
        self.inner.metrics()
    }

    /// Copy of all captured metric maps, as received
    pub fn metric_maps(&self) -> Vec<MetricMap> {
        self.inner.metric_maps()
    }

    /// Copy of all captured events
    pub fn events(&self) -> Events {
        self.inner.events()
    }
}

#[async_trait]
impl DispatchHandler for ExpectingHandler {
    fn estimated_tags(&self) -> usize {
        self.inner.estimated_tags()
    }

    fn dispatch_metrics(&self, ctx: &Context, metrics: Vec<Metric>) {
        let count = metrics.len() as u64;
        self.inner.dispatch_metrics(ctx, metrics);
        // Underflow is logged by the countdown and surfaced by wait_all
        let _ = self.metrics.done(count);
    }

    fn dispatch_metric_map(&self, ctx: &Context, mm: MetricMap) {
        self.inner.dispatch_metric_map(ctx, mm);
        let _ = self.metric_maps.done(1);
    }

    fn dispatch_event(&self, ctx: &Context, event: Event) {
        self.inner.dispatch_event(ctx, event);
        let _ = self.events.done(1);
    }

    async fn wait_for_events(&self) {
        self.inner.wait_for_events().await;
    }
}
