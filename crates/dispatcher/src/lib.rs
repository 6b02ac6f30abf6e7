//! # Dispatcher
//!
//! Dispatch handler implementations.
//!
//! Responsibilities:
//! - Capture dispatched entities for inspection (`CapturingHandler`)
//! - Block until a known amount of dispatch work has landed (`ExpectingHandler`)
//! - Stub out pipeline stages (`NopHandler`)
//! - Fan-out to multiple handlers, isolating slow ones behind queues

pub mod capturing;
pub mod countdown;
pub mod error;
pub mod expecting;
pub mod fanout;
pub mod forwarder;
pub mod log;
pub mod metrics;
pub mod nop;

pub use capturing::CapturingHandler;
pub use contracts::{Context, DispatchHandler};
pub use countdown::Countdown;
pub use error::DispatcherError;
pub use expecting::{ExpectingHandler, Outstanding};
pub use fanout::{create_dispatcher, create_handler, DispatcherBuilder, FanoutHandler};
pub use forwarder::Forwarder;
pub use log::LogHandler;
pub use metrics::{HandlerMetrics, MetricsSnapshot};
pub use nop::NopHandler;
