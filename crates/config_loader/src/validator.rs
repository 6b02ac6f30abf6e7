//! Configuration validation
//!
//! Rules:
//! - at least one handler
//! - handler names non-empty and unique
//! - queue_capacity > 0

use std::collections::HashSet;

use contracts::{ContractError, DispatchConfig};

/// Validate a DispatchConfig
///
/// Returns the first error encountered.
pub fn validate(config: &DispatchConfig) -> Result<(), ContractError> {
    if config.handlers.is_empty() {
        return Err(ContractError::config_validation(
            "handlers",
            "at least one handler is required",
        ));
    }
    validate_names(config)?;
    validate_queue_capacities(config)?;
    Ok(())
}

fn validate_names(config: &DispatchConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, handler) in config.handlers.iter().enumerate() {
        if handler.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("handlers[{idx}].name"),
                "handler name cannot be empty",
            ));
        }
        if !seen.insert(handler.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("handlers[name={}]", handler.name),
                "duplicate handler name",
            ));
        }
    }
    Ok(())
}

fn validate_queue_capacities(config: &DispatchConfig) -> Result<(), ContractError> {
    for handler in &config.handlers {
        if handler.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("handlers[{}].queue_capacity", handler.name),
                "queue_capacity must be > 0",
            ));
        }
    }
    Ok(())
}
