//! Constrained-transport collaborator seam.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Transport::params() (engine defaults)
//!     → config::overlay (LB_* environment values)
//!     → Transport::set_params() (single replace, only if something changed)
//!
//! Per request (non-media):
//!     http::bridge builds a BridgeRequest
//!     → Transport::send_request()
//!     → Ok(BridgeResponse) | Err(TransportError)
//! ```
//!
//! # Design Decisions
//! - The engine owns its parameters; the gateway only reads and replaces them
//! - Delivery failure is an explicit error kind, never an absent value
//! - The engine runs its own retry/ack cycle; callers never retry

pub mod https;

use std::time::Duration;

use async_trait::async_trait;
use axum::http::Method;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::backoff::{backoff_ceiling, MAX_BACKOFF};

pub use https::HttpsTransport;

/// Reliability parameters of the transport engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportParams {
    /// Skip certificate verification towards the homeserver.
    pub insecure_skip_verify: bool,

    /// Interval between flights of queued messages.
    pub flight_interval_secs: u64,

    /// Time without a heartbeat before the peer is considered gone.
    pub heartbeat_timeout_secs: u64,

    /// Keep-alive probes sent before the session is dropped.
    pub keep_alive_max_retries: u32,

    /// Timeout of a single keep-alive probe.
    pub keep_alive_timeout_secs: u64,

    /// Initial transmission window (unacknowledged messages in flight).
    pub transmission_nstart: u32,

    /// Time to wait for an acknowledgement before retransmitting.
    pub transmission_ack_timeout_secs: u64,

    /// Retransmissions after the first attempt.
    pub transmission_max_retransmits: u32,

    /// Long-poll observation of sync endpoints.
    pub observe_enabled: bool,

    /// Observed responses buffered per subscription.
    pub observe_buffer_size: usize,

    /// Time an observation may stay silent before it is re-established.
    pub observe_no_response_timeout_secs: u64,
}

impl Default for TransportParams {
    fn default() -> Self {
        Self {
            insecure_skip_verify: false,
            flight_interval_secs: 2,
            heartbeat_timeout_secs: 5,
            keep_alive_max_retries: 7,
            keep_alive_timeout_secs: 5,
            transmission_nstart: 1,
            transmission_ack_timeout_secs: 2,
            transmission_max_retransmits: 4,
            observe_enabled: false,
            observe_buffer_size: 1000,
            observe_no_response_timeout_secs: 10,
        }
    }
}

impl TransportParams {
    /// Time to wait for a delivery attempt to be acknowledged, at least one second.
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.transmission_ack_timeout_secs.max(1))
    }

    /// Time a single submission may take when the homeserver never
    /// acknowledges any attempt.
    ///
    /// Each attempt waits one ack timeout; retransmissions back off
    /// exponentially from the flight interval, capped and jittered.
    pub fn worst_case_delivery(&self) -> Duration {
        let attempts = self.transmission_max_retransmits.saturating_add(1);
        let mut total = self.ack_timeout().saturating_mul(attempts);

        let base = Duration::from_secs(self.flight_interval_secs);
        for retry in 1..=self.transmission_max_retransmits {
            total = total.saturating_add(backoff_ceiling(retry, base, MAX_BACKOFF));
        }
        total
    }
}

/// One discrete request handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeRequest {
    pub method: Method,
    /// Scheme-relative target, `//host:port/path?query`.
    pub url: String,
    /// Access token without the `Bearer ` prefix; empty when absent.
    pub token: String,
    pub body: Bytes,
}

/// Outcome of a delivered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Reasons a request could not be delivered at all.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Every attempt ran into the ack timeout.
    #[error("no acknowledgement after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// The homeserver could not be reached.
    #[error("homeserver unreachable: {0}")]
    Unreachable(String),

    /// The target URL could not be turned into a destination.
    #[error("invalid destination `{0}`")]
    InvalidDestination(String),

    /// Delivery failed for another reason after the retry budget ran out.
    #[error("delivery failed after {attempts} attempts: {reason}")]
    Exhausted { attempts: u32, reason: String },
}

impl TransportError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout { .. } => "timeout",
            TransportError::Unreachable(_) => "unreachable",
            TransportError::InvalidDestination(_) => "invalid_destination",
            TransportError::Exhausted { .. } => "exhausted",
        }
    }
}

/// The reliability-engineered transport the bridge delivers through.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Current parameters of the engine.
    fn params(&self) -> TransportParams;

    /// Replace the engine's parameters in one step.
    fn set_params(&self, params: TransportParams);

    /// Deliver one request and wait for its response.
    async fn send_request(&self, request: BridgeRequest) -> Result<BridgeResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_case_includes_backoff() {
        let params = TransportParams {
            transmission_ack_timeout_secs: 2,
            transmission_max_retransmits: 3,
            flight_interval_secs: 1,
            ..TransportParams::default()
        };
        // 4 attempts * 2s + (1 + 2 + 4)s of backoff, plus 10% jitter
        assert_eq!(params.worst_case_delivery(), Duration::from_millis(15_700));
    }

    #[test]
    fn worst_case_without_retransmits() {
        let params = TransportParams {
            transmission_ack_timeout_secs: 5,
            transmission_max_retransmits: 0,
            ..TransportParams::default()
        };
        assert_eq!(params.worst_case_delivery(), Duration::from_secs(5));
    }

    #[test]
    fn worst_case_uses_clamped_ack_timeout() {
        let params = TransportParams {
            transmission_ack_timeout_secs: 0,
            transmission_max_retransmits: 0,
            ..TransportParams::default()
        };
        assert_eq!(params.ack_timeout(), Duration::from_secs(1));
        assert_eq!(params.worst_case_delivery(), Duration::from_secs(1));
    }

    #[test]
    fn worst_case_caps_long_backoff() {
        let params = TransportParams {
            transmission_ack_timeout_secs: 2,
            transmission_max_retransmits: 3,
            flight_interval_secs: 100,
            ..TransportParams::default()
        };
        // 4 * 2s + 3 * (60s cap + 6s jitter)
        assert_eq!(params.worst_case_delivery(), Duration::from_secs(206));
    }

    #[test]
    fn error_kinds_are_distinct() {
        let errors = [
            TransportError::Timeout { attempts: 1 },
            TransportError::Unreachable("refused".into()),
            TransportError::InvalidDestination("//".into()),
            TransportError::Exhausted { attempts: 2, reason: "reset".into() },
        ];
        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.dedup();
        assert_eq!(kinds.len(), 4);
    }
}
