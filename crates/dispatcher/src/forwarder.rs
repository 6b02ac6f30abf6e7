//! Forwarder - relays dispatches to a downstream handler through an isolated
//! queue and worker task

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{Context, DispatchHandler, DoneFunc, Event, Metric, MetricMap};

use crate::countdown::Countdown;
use crate::metrics::HandlerMetrics;

/// Completion callbacks shared by several queued copies of one batch
///
/// Every holder keeps an `Arc`; the callbacks run when the last copy is
/// released, whether it was handed downstream, dropped or skipped.
pub(crate) struct Acknowledgement {
    callbacks: Vec<DoneFunc>,
}

impl Acknowledgement {
    pub(crate) fn new(callbacks: Vec<DoneFunc>) -> Self {
        Self { callbacks }
    }
}

impl Drop for Acknowledgement {
    fn drop(&mut self) {
        for done in self.callbacks.drain(..) {
            done();
        }
    }
}

/// Queued unit of work
enum Dispatch {
    Metrics(Context, Vec<Metric>, Option<Arc<Acknowledgement>>),
    MetricMap(Context, MetricMap),
    Event(Context, Event),
}

impl Dispatch {
    fn kind(&self) -> &'static str {
        match self {
            Self::Metrics(..) => "metrics",
            Self::MetricMap(..) => "metric_map",
            Self::Event(..) => "event",
        }
    }

    fn ctx(&self) -> &Context {
        match self {
            Self::Metrics(ctx, ..) | Self::MetricMap(ctx, _) | Self::Event(ctx, _) => ctx,
        }
    }

    fn is_event(&self) -> bool {
        matches!(self, Self::Event(..))
    }

    /// Give up on this work, acknowledging any metric callbacks
    fn release(self) {
        if let Self::Metrics(_, metrics, _) = self {
            for mut m in metrics {
                m.done();
            }
        }
    }
}

/// Handler that hands work to a downstream handler on a background task
///
/// Dispatch never blocks the producer: when the queue is full the work is
/// dropped and counted. Work whose context is cancelled before the worker
/// reaches it is skipped.
pub struct Forwarder {
    /// Handler name
    name: String,
    /// Channel to send work to worker
    tx: mpsc::Sender<Dispatch>,
    /// Downstream handler, shared with the worker
    downstream: Arc<dyn DispatchHandler>,
    /// Events accepted but not yet handed downstream
    pending_events: Arc<Countdown>,
    /// Shared metrics
    metrics: Arc<HandlerMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl Forwarder {
    /// Create a new Forwarder and spawn the worker task
    pub fn spawn(
        name: impl Into<String>,
        downstream: Arc<dyn DispatchHandler>,
        queue_capacity: usize,
    ) -> Self {
        let name = name.into();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(HandlerMetrics::new());
        let pending_events = Arc::new(Countdown::new("pending_events"));

        let worker = Worker {
            name: name.clone(),
            downstream: Arc::clone(&downstream),
            pending_events: Arc::clone(&pending_events),
            metrics: Arc::clone(&metrics),
        };
        let worker_handle = tokio::spawn(worker.run(rx));

        Self {
            name,
            tx,
            downstream,
            pending_events,
            metrics,
            worker_handle,
        }
    }

    /// Get handler name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<HandlerMetrics> {
        &self.metrics
    }

    /// Queue work for the worker (non-blocking)
    ///
    /// Returns true if queued, false if it was dropped or skipped
    fn enqueue(&self, dispatch: Dispatch) -> bool {
        let kind = dispatch.kind();

        if dispatch.ctx().is_cancelled() {
            self.metrics.inc_cancelled_count();
            debug!(handler = %self.name, kind, "Context cancelled, dispatch skipped");
            dispatch.release();
            return false;
        }

        let is_event = dispatch.is_event();
        if is_event {
            self.pending_events.add(1);
        }

        match self.tx.try_send(dispatch) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(err) => {
                if is_event {
                    let _ = self.pending_events.done(1);
                }
                match err {
                    mpsc::error::TrySendError::Full(d) => {
                        self.metrics.inc_dropped_count();
                        observability::record_dispatch_dropped(&self.name, kind);
                        warn!(handler = %self.name, kind, "Queue full, dispatch dropped");
                        d.release();
                    }
                    mpsc::error::TrySendError::Closed(d) => {
                        error!(handler = %self.name, "Forwarder worker closed unexpectedly");
                        d.release();
                    }
                }
                false
            }
        }
    }

    /// Queue a batch whose callbacks were detached into `ack`.
    ///
    /// The worker releases its hold on `ack` once the batch has been handed
    /// downstream.
    pub(crate) fn dispatch_acknowledged(
        &self,
        ctx: &Context,
        metrics: Vec<Metric>,
        ack: Arc<Acknowledgement>,
    ) {
        if metrics.is_empty() {
            return;
        }
        self.enqueue(Dispatch::Metrics(ctx.clone(), metrics, Some(ack)));
    }

    /// Shutdown the worker gracefully
    #[instrument(name = "forwarder_shutdown", skip(self), fields(handler = %self.name))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(handler = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(handler = %self.name, "Forwarder shutdown complete");
    }
}

#[async_trait]
impl DispatchHandler for Forwarder {
    fn estimated_tags(&self) -> usize {
        self.downstream.estimated_tags()
    }

    fn dispatch_metrics(&self, ctx: &Context, metrics: Vec<Metric>) {
        if metrics.is_empty() {
            return;
        }
        self.enqueue(Dispatch::Metrics(ctx.clone(), metrics, None));
    }

    fn dispatch_metric_map(&self, ctx: &Context, mm: MetricMap) {
        self.enqueue(Dispatch::MetricMap(ctx.clone(), mm));
    }

    fn dispatch_event(&self, ctx: &Context, event: Event) {
        self.enqueue(Dispatch::Event(ctx.clone(), event));
    }

    async fn wait_for_events(&self) {
        if let Err(e) = self.pending_events.wait().await {
            error!(handler = %self.name, error = %e, "Waiting for pending events failed");
        }
        self.downstream.wait_for_events().await;
    }
}

/// State owned by the worker task
struct Worker {
    name: String,
    downstream: Arc<dyn DispatchHandler>,
    pending_events: Arc<Countdown>,
    metrics: Arc<HandlerMetrics>,
}

impl Worker {
    #[instrument(name = "forwarder_worker_loop", skip(self, rx), fields(handler = %self.name))]
    async fn run(self, mut rx: mpsc::Receiver<Dispatch>) {
        debug!(handler = %self.name, "Forwarder worker started");

        while let Some(dispatch) = rx.recv().await {
            self.metrics.set_queue_len(rx.len());
            observability::record_queue_depth(&self.name, rx.len());

            let is_event = dispatch.is_event();
            self.forward(dispatch);
            if is_event {
                let _ = self.pending_events.done(1);
            }
        }

        // Flush downstream before exiting
        self.downstream.wait_for_events().await;

        debug!(handler = %self.name, "Forwarder worker stopped");
    }

    fn forward(&self, dispatch: Dispatch) {
        if dispatch.ctx().is_cancelled() {
            self.metrics.inc_cancelled_count();
            debug!(handler = %self.name, kind = dispatch.kind(), "Context cancelled, dispatch skipped");
            dispatch.release();
            return;
        }

        match dispatch {
            Dispatch::Metrics(ctx, metrics, ack) => {
                let count = metrics.len() as u64;
                self.downstream.dispatch_metrics(&ctx, metrics);
                drop(ack);
                self.metrics.add_metrics_forwarded(count);
                observability::record_dispatched(&self.name, "metrics", count);
            }
            Dispatch::MetricMap(ctx, mm) => {
                self.downstream.dispatch_metric_map(&ctx, mm);
                self.metrics.inc_maps_forwarded();
                observability::record_dispatched(&self.name, "metric_map", 1);
            }
            Dispatch::Event(ctx, event) => {
                self.downstream.dispatch_event(&ctx, event);
                self.metrics.inc_events_forwarded();
                observability::record_dispatched(&self.name, "event", 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capturing::CapturingHandler;
    use crate::expecting::ExpectingHandler;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_forwarder_basic() {
        let capture = Arc::new(CapturingHandler::new().with_estimated_tags(3));
        let forwarder = Forwarder::spawn("test", capture.clone(), 10);
        let ctx = Context::new();

        assert_eq!(forwarder.estimated_tags(), 3);
        for i in 0..5 {
            forwarder.dispatch_metrics(&ctx, vec![Metric::counter("c", i as f64)]);
        }
        forwarder.dispatch_event(&ctx, Event::new("deploy", ""));

        timeout(Duration::from_secs(1), forwarder.wait_for_events())
            .await
            .expect("wait_for_events timed out");
        assert_eq!(capture.events().len(), 1);

        forwarder.shutdown().await;
        assert_eq!(capture.metrics().len(), 5);
    }

    #[tokio::test]
    async fn test_forwarder_preserves_order() {
        let downstream = Arc::new(ExpectingHandler::new());
        downstream.expect(0, 0, 3);
        let forwarder = Forwarder::spawn("ordered", downstream.clone(), 10);
        let ctx = Context::new();

        for title in ["a", "b", "c"] {
            forwarder.dispatch_event(&ctx, Event::new(title, ""));
        }
        downstream.wait_all().await.unwrap();

        let titles: Vec<_> = downstream.events().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        forwarder.shutdown().await;
    }

    #[tokio::test]
    async fn test_forwarder_queue_full() {
        let capture = Arc::new(CapturingHandler::new());
        let forwarder = Forwarder::spawn("small", capture.clone(), 2);
        let ctx = Context::new();

        // The worker cannot run before we yield, so the queue fills up
        for i in 0..10 {
            forwarder.dispatch_event(&ctx, Event::new(format!("e{i}"), ""));
        }
        assert_eq!(forwarder.metrics().dropped_count(), 8);

        forwarder.wait_for_events().await;
        assert_eq!(capture.events().len(), 2);
        forwarder.shutdown().await;
    }

    #[tokio::test]
    async fn test_dropped_metrics_are_acknowledged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let forwarder = Forwarder::spawn("tiny", Arc::new(CapturingHandler::new()), 1);
        let ctx = Context::new();

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            forwarder.dispatch_metrics(
                &ctx,
                vec![Metric::counter("c", 1.0).with_done(Arc::new(move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                }))],
            );
        }

        assert_eq!(forwarder.metrics().dropped_count(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        forwarder.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_work() {
        let capture = Arc::new(CapturingHandler::new());
        let forwarder = Forwarder::spawn("cancel", capture.clone(), 10);

        let cancelled = Context::new();
        cancelled.cancel();
        forwarder.dispatch_metrics(&cancelled, vec![Metric::counter("a", 1.0)]);

        // Queued, then cancelled before the worker gets to it
        let late = Context::new();
        forwarder.dispatch_event(&late, Event::new("late", ""));
        late.cancel();

        forwarder.wait_for_events().await;
        assert!(capture.metrics().is_empty());
        assert!(capture.events().is_empty());
        assert_eq!(forwarder.metrics().cancelled_count(), 2);
        forwarder.shutdown().await;
    }
}
