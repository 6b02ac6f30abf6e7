//! Layered error definitions
//!
//! Categorized by source: config / accounting / general

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Accounting Errors =====
    /// More work completed than was expected
    #[error("counter underflow in '{category}': {excess} unit(s) completed beyond expectation")]
    CounterUnderflow { category: String, excess: u64 },

    /// Completion counter can no longer be observed
    #[error("completion counter '{category}' closed")]
    CounterClosed { category: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create counter underflow error
    pub fn counter_underflow(category: impl Into<String>, excess: u64) -> Self {
        Self::CounterUnderflow {
            category: category.into(),
            excess,
        }
    }
}
