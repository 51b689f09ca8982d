//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::security::blocklist::BlockedNetworkRule;

/// Largest upstream payload relayed to a caller, in bytes (5 MiB).
pub const DEFAULT_MAX_CONTENT_LENGTH: u64 = 5 * 1024 * 1024;

/// Root configuration for the asset proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Payload and redirect limits.
    pub limits: LimitsConfig,

    /// Outbound fetch deadlines.
    pub timeouts: TimeoutConfig,

    /// Block-list and loop detection.
    pub security: SecurityConfig,

    /// Defaults applied to relayed responses.
    pub response: ResponseConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to bind. Overridden by the `PORT` environment variable.
    pub port: u16,
}

impl ListenerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
        }
    }
}

/// Payload and redirect limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum relayed body size in bytes, checked against Content-Length
    /// and enforced on the stream.
    pub max_content_length: u64,

    /// Maximum request hops, the original request included.
    pub max_hops: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            max_hops: 4,
        }
    }
}

/// Timeout configuration for outbound fetches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total outbound fetch deadline, body included, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Address prefixes the proxy refuses to reach.
    pub blocked_networks: Vec<BlockedNetworkRule>,

    /// Token identifying this proxy in `Via` headers.
    pub via_token: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            blocked_networks: BlockedNetworkRule::defaults(),
            via_token: "assetproxy".to_string(),
        }
    }
}

/// Defaults applied to outbound requests and relayed responses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Cache-Control sent when the upstream omits one.
    pub default_cache_control: String,

    /// Accept sent upstream when the caller omits one.
    pub default_accept: String,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            default_cache_control: "public, max-age=3600".to_string(),
            default_accept: "image/*".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
