//! # Contracts
//!
//! Frozen interface contracts between pipeline stages: the entities that move
//! through the pipeline and the `DispatchHandler` trait every stage implements.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Timestamps are nanoseconds since the Unix epoch (`Nanotime`)

mod error;
mod event;
mod handler;
mod handler_config;
mod metric;
mod metric_map;

pub use error::*;
pub use event::*;
pub use handler::{Context, DispatchHandler};
pub use handler_config::*;
pub use metric::*;
pub use metric_map::*;
