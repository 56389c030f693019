//! Configuration validation

use crate::{ConfigError, DeployConfig, Result};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire deployment configuration
pub fn validate_config(config: &DeployConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.network.rpc_url.is_empty() {
        errors.push(ValidationError::new(
            "network.rpc_url",
            "rpc url must be set",
        ));
    }

    if config.network.account.is_empty() {
        errors.push(ValidationError::new(
            "network.account",
            "sending account must be set",
        ));
    }

    if config.network.min_confirmations == 0 {
        errors.push(ValidationError::new(
            "network.min_confirmations",
            "must require at least one confirmation",
        ));
    }

    if config.supervisor.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "supervisor.poll_interval_ms",
            "poll interval must be greater than 0",
        ));
    }

    if config.supervisor.stall_threshold_ms < config.supervisor.poll_interval_ms {
        errors.push(ValidationError::new(
            "supervisor.stall_threshold_ms",
            "stall threshold must be at least one poll interval",
        ));
    }

    if config.supervisor.interaction_timeout_ms <= config.supervisor.stall_threshold_ms {
        errors.push(ValidationError::new(
            "supervisor.interaction_timeout_ms",
            "interaction timeout must exceed the stall threshold",
        ));
    }

    if config.journal.dir.is_empty() {
        errors.push(ValidationError::new("journal.dir", "must be set"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        let combined: Vec<String> = errors.iter().map(ToString::to_string).collect();
        Err(ConfigError::ValidationError(combined.join("; ")))
    }
}
