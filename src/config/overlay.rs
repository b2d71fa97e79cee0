//! Environment overlay for the transport engine's parameters.
//!
//! # Responsibilities
//! - Read the fixed set of `LB_*` variables
//! - Parse every present value before touching anything
//! - Replace the engine's parameters in one call, or not at all
//!
//! # Design Decisions
//! - An empty variable counts as absent
//! - Flags are true only for the literal `1`
//! - A bad integer is fatal; there is no fallback to the default

use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;

use crate::transport::{Transport, TransportParams};

/// Errors raised while applying overrides.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("{name}={value:?} is not a non-negative base-10 integer: {source}")]
    InvalidInteger {
        name: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// One overridable transport parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Override {
    InsecureSkipVerify,
    FlightIntervalSecs,
    HeartbeatTimeoutSecs,
    KeepAliveMaxRetries,
    KeepAliveTimeoutSecs,
    TransmissionNStart,
    TransmissionAckTimeoutSecs,
    TransmissionMaxRetransmits,
    ObserveEnabled,
    ObserveBufferSize,
    ObserveNoResponseTimeoutSecs,
}

impl Override {
    pub const ALL: [Override; 11] = [
        Override::InsecureSkipVerify,
        Override::FlightIntervalSecs,
        Override::HeartbeatTimeoutSecs,
        Override::KeepAliveMaxRetries,
        Override::KeepAliveTimeoutSecs,
        Override::TransmissionNStart,
        Override::TransmissionAckTimeoutSecs,
        Override::TransmissionMaxRetransmits,
        Override::ObserveEnabled,
        Override::ObserveBufferSize,
        Override::ObserveNoResponseTimeoutSecs,
    ];

    /// Environment variable name.
    pub fn var_name(self) -> &'static str {
        match self {
            Override::InsecureSkipVerify => "LB_INSECURE_SKIP_VERIFY",
            Override::FlightIntervalSecs => "LB_FLIGHT_INTERVAL_SECS",
            Override::HeartbeatTimeoutSecs => "LB_HEARTBEAT_TIMEOUT_SECS",
            Override::KeepAliveMaxRetries => "LB_KEEP_ALIVE_MAX_RETRIES",
            Override::KeepAliveTimeoutSecs => "LB_KEEP_ALIVE_TIMEOUT_SECS",
            Override::TransmissionNStart => "LB_TRANSMISSION_NSTART",
            Override::TransmissionAckTimeoutSecs => "LB_TRANSMISSION_ACK_TIMEOUT_SECS",
            Override::TransmissionMaxRetransmits => "LB_TRANSMISSION_MAX_RETRANSMITS",
            Override::ObserveEnabled => "LB_OBSERVE_ENABLED",
            Override::ObserveBufferSize => "LB_OBSERVE_BUFFER_SIZE",
            Override::ObserveNoResponseTimeoutSecs => "LB_OBSERVE_NO_RESPONSE_TIMEOUT_SECS",
        }
    }

    fn apply(self, params: &mut TransportParams, value: &str) -> Result<(), OverlayError> {
        let name = self.var_name();
        match self {
            Override::InsecureSkipVerify => params.insecure_skip_verify = flag(value),
            Override::FlightIntervalSecs => params.flight_interval_secs = int(name, value)?,
            Override::HeartbeatTimeoutSecs => params.heartbeat_timeout_secs = int(name, value)?,
            Override::KeepAliveMaxRetries => params.keep_alive_max_retries = int(name, value)?,
            Override::KeepAliveTimeoutSecs => params.keep_alive_timeout_secs = int(name, value)?,
            Override::TransmissionNStart => params.transmission_nstart = int(name, value)?,
            Override::TransmissionAckTimeoutSecs => {
                params.transmission_ack_timeout_secs = int(name, value)?
            }
            Override::TransmissionMaxRetransmits => {
                params.transmission_max_retransmits = int(name, value)?
            }
            Override::ObserveEnabled => params.observe_enabled = flag(value),
            Override::ObserveBufferSize => params.observe_buffer_size = int(name, value)?,
            Override::ObserveNoResponseTimeoutSecs => {
                params.observe_no_response_timeout_secs = int(name, value)?
            }
        }
        Ok(())
    }
}

fn flag(value: &str) -> bool {
    value == "1"
}

fn int<T>(name: &'static str, value: &str) -> Result<T, OverlayError>
where
    T: FromStr<Err = ParseIntError>,
{
    value.parse().map_err(|source| OverlayError::InvalidInteger {
        name,
        value: value.to_string(),
        source,
    })
}

/// Apply every present override to a copy of `current`.
///
/// Returns `None` when no override variable is present.
pub fn overlay_params<F>(current: &TransportParams, lookup: F) -> Result<Option<TransportParams>, OverlayError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut updated = current.clone();
    let mut changed = false;

    for item in Override::ALL {
        let Some(value) = lookup(item.var_name()).filter(|v| !v.is_empty()) else {
            continue;
        };
        item.apply(&mut updated, &value)?;
        changed = true;
    }

    Ok(changed.then_some(updated))
}

/// Overlay `lookup` values onto the transport's parameters.
///
/// Returns the effective parameters; `set_params` is only called when at
/// least one override was present.
pub fn apply_overrides_with<F>(transport: &dyn Transport, lookup: F) -> Result<TransportParams, OverlayError>
where
    F: Fn(&str) -> Option<String>,
{
    let current = transport.params();
    match overlay_params(&current, lookup)? {
        Some(updated) => {
            tracing::info!("Detected one or more LB_ environment variables");
            tracing::info!(params = ?updated, "New transport configuration");
            transport.set_params(updated.clone());
            Ok(updated)
        }
        None => Ok(current),
    }
}
