//! Resilience helpers for the reference transport.
//!
//! # Data Flow
//! ```text
//! HttpsTransport attempt fails
//!     → retries.rs (is this failure retryable for this method?)
//!     → backoff.rs (how long to wait before the next attempt)
//! ```
//!
//! # Design Decisions
//! - The gateway itself never retries; only the transport engine does
//! - Retries only for idempotent requests unless the request never left
//! - Jittered backoff prevents synchronized retransmissions

pub mod backoff;
pub mod retries;
