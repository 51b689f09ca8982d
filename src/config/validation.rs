//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, timeouts > 0)
//! - Check block-list prefixes fit their address family
//! - Check header defaults are sendable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("limits.max_content_length must be greater than zero")]
    ZeroContentLength,

    #[error("limits.max_hops must be at least 1")]
    ZeroHops,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("security.blocked_networks[{0}] has an empty prefix")]
    EmptyPrefix(usize),

    #[error("security.blocked_networks[{index}] prefix is {len} bytes, longer than a {width}-byte address")]
    PrefixTooLong { index: usize, len: usize, width: usize },

    #[error("security.via_token must be a non-empty token without whitespace or commas")]
    InvalidViaToken,

    #[error("response.{0} is not a valid header value")]
    InvalidHeaderDefault(&'static str),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.limits.max_content_length == 0 {
        errors.push(ValidationError::ZeroContentLength);
    }
    if config.limits.max_hops == 0 {
        errors.push(ValidationError::ZeroHops);
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    for (index, rule) in config.security.blocked_networks.iter().enumerate() {
        let width = rule.family.width();
        if rule.prefix.is_empty() {
            errors.push(ValidationError::EmptyPrefix(index));
        } else if rule.prefix.len() > width {
            errors.push(ValidationError::PrefixTooLong {
                index,
                len: rule.prefix.len(),
                width,
            });
        }
    }

    let token = &config.security.via_token;
    if token.is_empty()
        || token.chars().any(|c| c.is_whitespace() || c == ',')
        || HeaderValue::from_str(token).is_err()
    {
        errors.push(ValidationError::InvalidViaToken);
    }

    if HeaderValue::from_str(&config.response.default_cache_control).is_err() {
        errors.push(ValidationError::InvalidHeaderDefault("default_cache_control"));
    }
    if HeaderValue::from_str(&config.response.default_accept).is_err() {
        errors.push(ValidationError::InvalidHeaderDefault("default_accept"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
