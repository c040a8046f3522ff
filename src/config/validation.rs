//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, thresholds > 0, alpha in (0, 1))
//! - Enforce probe timeout <= probe interval so stop latency stays bounded
//! - Check static instance lists (non-empty host, non-zero port)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{BalancerConfig, ServiceConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{scope}: {field} must be greater than zero")]
    Zero { scope: String, field: &'static str },

    #[error("{scope}: health_check.timeout_ms ({timeout_ms}) exceeds interval_ms ({interval_ms})")]
    ProbeTimeoutExceedsInterval {
        scope: String,
        timeout_ms: u64,
        interval_ms: u64,
    },

    #[error("{scope}: ewma_alpha must be in (0, 1)")]
    Alpha { scope: String },

    #[error("{scope}: retry.base_delay_ms exceeds retry.max_delay_ms")]
    RetryDelays { scope: String },

    #[error("discovery.{service}[{index}]: {reason}")]
    Instance {
        service: String,
        index: usize,
        reason: &'static str,
    },
}

/// Validate the whole configuration.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_service("default_service", &config.default_service, &mut errors);
    let mut names: Vec<&String> = config.services.keys().collect();
    names.sort();
    for name in names {
        check_service(&format!("services.{}", name), &config.services[name], &mut errors);
    }

    for (service, instances) in &config.discovery {
        for (index, instance) in instances.iter().enumerate() {
            if instance.host.trim().is_empty() {
                errors.push(ValidationError::Instance {
                    service: service.clone(),
                    index,
                    reason: "host is empty",
                });
            }
            if instance.port == 0 {
                errors.push(ValidationError::Instance {
                    service: service.clone(),
                    index,
                    reason: "port is zero",
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one service config. `scope` prefixes every error message.
pub fn validate_service(scope: &str, service: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_service(scope, service, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_service(scope: &str, service: &ServiceConfig, errors: &mut Vec<ValidationError>) {
    let zero = |field: &'static str| ValidationError::Zero {
        scope: scope.to_string(),
        field,
    };

    if service.refresh_interval_ms == 0 {
        errors.push(zero("refresh_interval_ms"));
    }
    if service.refresh_timeout_ms == 0 {
        errors.push(zero("refresh_timeout_ms"));
    }
    if !(service.ewma_alpha > 0.0 && service.ewma_alpha < 1.0) {
        errors.push(ValidationError::Alpha {
            scope: scope.to_string(),
        });
    }

    let hc = &service.health_check;
    if hc.interval_ms == 0 {
        errors.push(zero("health_check.interval_ms"));
    }
    if hc.timeout_ms == 0 {
        errors.push(zero("health_check.timeout_ms"));
    }
    if hc.healthy_threshold == 0 {
        errors.push(zero("health_check.healthy_threshold"));
    }
    if hc.unhealthy_threshold == 0 {
        errors.push(zero("health_check.unhealthy_threshold"));
    }
    if hc.timeout_ms > hc.interval_ms {
        errors.push(ValidationError::ProbeTimeoutExceedsInterval {
            scope: scope.to_string(),
            timeout_ms: hc.timeout_ms,
            interval_ms: hc.interval_ms,
        });
    }

    if service.availability.failure_threshold == 0 {
        errors.push(zero("availability.failure_threshold"));
    }
    if service.availability.max_active_requests == 0 {
        errors.push(zero("availability.max_active_requests"));
    }
    if service.retry.max_attempts == 0 {
        errors.push(zero("retry.max_attempts"));
    }
    if service.retry.base_delay_ms > service.retry.max_delay_ms {
        errors.push(ValidationError::RetryDelays {
            scope: scope.to_string(),
        });
    }
}
