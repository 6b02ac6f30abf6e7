//! DispatchHandler trait - handoff interface between pipeline stages
//!
//! Producers hold an `Arc<dyn DispatchHandler>` and never a concrete type;
//! which implementation is wired in is decided at setup time.

use async_trait::async_trait;

use crate::{Event, Metric, MetricMap};

/// Cancellation/deadline carrier passed to every dispatch call.
///
/// A handler stops initiating new downstream work once the context is
/// cancelled. Work already committed is not undone.
pub type Context = tokio_util::sync::CancellationToken;

/// Pipeline stage consumer
///
/// All dispatch operations may be called concurrently from multiple
/// producers and must return once the input is recorded or enqueued.
/// Dispatch is fire-and-record: there is no error to report to the producer.
///
/// # Example
///
/// ```ignore
/// let handler: Arc<dyn DispatchHandler> = build_handler();
/// let ctx = Context::new();
/// handler.dispatch_metrics(&ctx, vec![Metric::counter("hits", 1.0)]);
/// handler.wait_for_events().await;
/// ```
#[async_trait]
pub trait DispatchHandler: Send + Sync {
    /// Hint of how many tags this handler attaches per metric.
    ///
    /// Used by producers to pre-size tag buffers. 0 means unknown.
    fn estimated_tags(&self) -> usize;

    /// Hand off a batch of individual metrics
    fn dispatch_metrics(&self, ctx: &Context, metrics: Vec<Metric>);

    /// Hand off a pre-aggregated batch
    fn dispatch_metric_map(&self, ctx: &Context, mm: MetricMap);

    /// Hand off a single event
    fn dispatch_event(&self, ctx: &Context, event: Event);

    /// Wait until every event this handler is responsible for flushing
    /// has been processed downstream.
    async fn wait_for_events(&self);
}
