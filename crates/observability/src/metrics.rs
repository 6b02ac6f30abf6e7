//! Dispatch traffic metrics
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! these are no-ops.

use metrics::{counter, gauge};

/// Record units handed to a downstream handler
pub fn record_dispatched(handler: &str, kind: &'static str, count: u64) {
    counter!(
        "dispatch_forwarded_total",
        "handler" => handler.to_string(),
        "kind" => kind
    )
    .increment(count);
}

/// Record a dispatch dropped because a queue was full
pub fn record_dispatch_dropped(handler: &str, kind: &'static str) {
    counter!(
        "dispatch_dropped_total",
        "handler" => handler.to_string(),
        "kind" => kind
    )
    .increment(1);
}

/// Record current queue depth of a forwarder
pub fn record_queue_depth(handler: &str, depth: usize) {
    gauge!(
        "dispatch_queue_depth",
        "handler" => handler.to_string()
    )
    .set(depth as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_dispatched("h", "metrics", 3);
        record_dispatch_dropped("h", "event");
        record_queue_depth("h", 4);
    }
}
