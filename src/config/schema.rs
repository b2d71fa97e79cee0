//! Configuration schema definitions.
//!
//! This module defines the gateway's own settings. All types derive Serde
//! traits for deserialization from an optional TOML file. Transport
//! reliability parameters are not part of it: they belong to the transport
//! engine and are only changed by the environment overlay.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Homeserver destination as `host:port`, without a scheme.
    pub homeserver: String,

    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Connection-level timeouts.
    pub timeouts: TimeoutConfig,

    /// Transport bridge limits.
    pub bridge: BridgeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., ":8008" or "127.0.0.1:8008").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: ":8008".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration, in seconds.
///
/// These must outlast the transport engine's worst-case retry cycle or
/// bridged requests get cut off mid-flight.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed to drain a bridged request body.
    pub read_secs: u64,

    /// Time allowed to produce a response for any request.
    pub write_secs: u64,

    /// Idle time of a keep-alive connection between requests.
    pub idle_secs: u64,

    /// Time allowed to receive the request headers.
    pub read_header_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 300,
            write_secs: 300,
            idle_secs: 300,
            read_header_secs: 300,
        }
    }
}

/// Transport bridge settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Largest request body buffered for a bridged request.
    pub max_body_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Prometheus exporter bind address; no exporter when unset.
    pub metrics_address: Option<String>,
}
