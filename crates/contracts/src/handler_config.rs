//! Handler configuration
//!
//! Describes which handlers a dispatcher fans out to.

use serde::{Deserialize, Serialize};

/// Top-level dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Downstream handlers, one forwarder each
    pub handlers: Vec<HandlerConfig>,
}

/// Single handler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Handler name (used for logging/metrics)
    pub name: String,

    /// Handler type
    pub handler_type: HandlerType,

    /// Forwarding queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Tag count hint reported through `estimated_tags`
    #[serde(default)]
    pub estimated_tags: usize,

    /// Capture only: invoke metric callbacks before clearing them
    #[serde(default)]
    pub acknowledge: bool,
}

fn default_queue_capacity() -> usize {
    100
}

/// Handler type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerType {
    /// Keep everything in memory for inspection
    Capture,
    /// Log dispatch summaries
    Log,
    /// Discard everything
    Nop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let cfg: HandlerConfig =
            serde_json::from_str(r#"{"name":"cap","handler_type":"capture"}"#).unwrap();
        assert_eq!(cfg.queue_capacity, 100);
        assert_eq!(cfg.estimated_tags, 0);
        assert!(!cfg.acknowledge);
        assert_eq!(cfg.handler_type, HandlerType::Capture);
    }
}
