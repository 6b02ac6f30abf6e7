//! FanoutHandler - relays every dispatch to a set of forwarders

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use contracts::{
    Context, DispatchConfig, DispatchHandler, DoneFunc, Event, HandlerConfig, HandlerType, Metric,
    MetricMap,
};

use crate::capturing::CapturingHandler;
use crate::error::DispatcherError;
use crate::forwarder::{Acknowledgement, Forwarder};
use crate::log::LogHandler;
use crate::metrics::MetricsSnapshot;
use crate::nop::NopHandler;

/// Builder for creating a FanoutHandler
///
/// Must be built inside a tokio runtime, since each forwarder spawns a worker.
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: Vec<(String, Arc<dyn DispatchHandler>, usize)>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a downstream handler behind its own queue
    pub fn handler(
        mut self,
        name: impl Into<String>,
        handler: Arc<dyn DispatchHandler>,
        queue_capacity: usize,
    ) -> Self {
        self.handlers.push((name.into(), handler, queue_capacity));
        self
    }

    /// Add a downstream handler described by configuration
    pub fn configured(self, config: &HandlerConfig) -> Result<Self, DispatcherError> {
        let handler = create_handler(config)?;
        Ok(self.handler(config.name.as_str(), handler, config.queue_capacity))
    }

    /// Spawn one forwarder per handler
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(handler_count = self.handlers.len())
    )]
    pub fn build(self) -> FanoutHandler {
        let forwarders = self
            .handlers
            .into_iter()
            .map(|(name, handler, capacity)| Forwarder::spawn(name, handler, capacity))
            .collect();
        FanoutHandler::with_forwarders(forwarders)
    }
}

/// Create a handler from configuration
#[instrument(
    name = "dispatcher_create_handler",
    skip(config),
    fields(handler = %config.name, handler_type = ?config.handler_type)
)]
pub fn create_handler(config: &HandlerConfig) -> Result<Arc<dyn DispatchHandler>, DispatcherError> {
    if config.queue_capacity == 0 {
        return Err(DispatcherError::handler_creation(
            &config.name,
            "queue_capacity must be > 0",
        ));
    }

    let handler: Arc<dyn DispatchHandler> = match config.handler_type {
        HandlerType::Capture => {
            let capture = if config.acknowledge {
                CapturingHandler::acknowledging()
            } else {
                CapturingHandler::new()
            };
            Arc::new(capture.with_estimated_tags(config.estimated_tags))
        }
        HandlerType::Log => Arc::new(
            LogHandler::new(config.name.as_str()).with_estimated_tags(config.estimated_tags),
        ),
        HandlerType::Nop => Arc::new(NopHandler),
    };
    Ok(handler)
}

/// Convenience function to create a dispatcher from configuration
#[instrument(name = "dispatcher_create", skip(config))]
pub fn create_dispatcher(config: &DispatchConfig) -> Result<FanoutHandler, DispatcherError> {
    let mut builder = DispatcherBuilder::new();
    for handler_config in &config.handlers {
        builder = builder.configured(handler_config)?;
    }
    Ok(builder.build())
}

/// Handler that fans every dispatch out to its forwarders
///
/// Metric callbacks are detached from the copies and invoked once, after
/// the last forwarder's worker has handed its copy downstream (or dropped
/// it).
pub struct FanoutHandler {
    forwarders: Vec<Forwarder>,
}

impl FanoutHandler {
    /// Create a fan-out over existing forwarders
    pub fn with_forwarders(forwarders: Vec<Forwarder>) -> Self {
        info!(handlers = forwarders.len(), "Fan-out dispatcher started");
        Self { forwarders }
    }

    pub fn len(&self) -> usize {
        self.forwarders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forwarders.is_empty()
    }

    /// Get metrics for all forwarders
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.forwarders
            .iter()
            .map(|f| (f.name().to_string(), f.metrics().snapshot()))
            .collect()
    }

    /// Close every forwarder queue and join the workers
    #[instrument(name = "fanout_shutdown", skip(self))]
    pub async fn shutdown(self) {
        for forwarder in self.forwarders {
            forwarder.shutdown().await;
        }
        info!("Fan-out dispatcher shutdown complete");
    }

    /// Hand `value` to every forwarder, cloning for all but the last
    fn fan_out<T: Clone>(&self, value: T, mut send: impl FnMut(&Forwarder, T)) {
        if let Some((last, rest)) = self.forwarders.split_last() {
            for forwarder in rest {
                send(forwarder, value.clone());
            }
            send(last, value);
        }
    }
}

#[async_trait]
impl DispatchHandler for FanoutHandler {
    fn estimated_tags(&self) -> usize {
        self.forwarders
            .iter()
            .map(|f| f.estimated_tags())
            .max()
            .unwrap_or(0)
    }

    fn dispatch_metrics(&self, ctx: &Context, mut metrics: Vec<Metric>) {
        let callbacks: Vec<DoneFunc> = metrics.iter_mut().filter_map(|m| m.done.take()).collect();
        let ack = Arc::new(Acknowledgement::new(callbacks));

        self.fan_out(metrics, |f, m| {
            f.dispatch_acknowledged(ctx, m, Arc::clone(&ack))
        });
    }

    fn dispatch_metric_map(&self, ctx: &Context, mm: MetricMap) {
        self.fan_out(mm, |f, mm| f.dispatch_metric_map(ctx, mm));
    }

    fn dispatch_event(&self, ctx: &Context, event: Event) {
        self.fan_out(event, |f, e| f.dispatch_event(ctx, e));
    }

    async fn wait_for_events(&self) {
        for forwarder in &self.forwarders {
            forwarder.wait_for_events().await;
        }
        debug!("All forwarders flushed events");
    }
}
