//! Retry classification for the reference transport.
//!
//! # Design Decisions
//! - Connect failures are always retryable: the request never left
//! - Timeouts are retried only for idempotent methods
//! - Any HTTP response, whatever its status, is an outcome and ends the loop

use axum::http::Method;

/// How a single delivery attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptFailure {
    /// No connection could be established.
    Connect,
    /// The attempt exceeded the ack timeout.
    Timeout,
    /// Anything else (reset mid-response, protocol error).
    Other,
}

impl AttemptFailure {
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_connect() {
            AttemptFailure::Connect
        } else if err.is_timeout() {
            AttemptFailure::Timeout
        } else {
            AttemptFailure::Other
        }
    }
}

/// Whether a failed attempt may be sent again.
pub fn is_retryable(method: &Method, failure: AttemptFailure) -> bool {
    match failure {
        AttemptFailure::Connect => true,
        AttemptFailure::Timeout | AttemptFailure::Other => method.is_idempotent(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_failures_always_retry() {
        assert!(is_retryable(&Method::POST, AttemptFailure::Connect));
        assert!(is_retryable(&Method::GET, AttemptFailure::Connect));
    }

    #[test]
    fn timeouts_retry_only_idempotent() {
        assert!(is_retryable(&Method::GET, AttemptFailure::Timeout));
        assert!(is_retryable(&Method::PUT, AttemptFailure::Timeout));
        assert!(!is_retryable(&Method::POST, AttemptFailure::Timeout));
        assert!(!is_retryable(&Method::PATCH, AttemptFailure::Other));
    }
}
