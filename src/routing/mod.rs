//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (RequestClassifier)
//!     → matcher.rs (media pattern)
//!     → Route::Media (byte-stream relay) | Route::Api (transport bridge)
//! ```
//!
//! # Design Decisions
//! - Pattern compiled at startup, immutable at runtime
//! - Deterministic: same path always yields the same route
//! - Classification looks at the path only, never headers or method

pub mod matcher;
pub mod router;

pub use router::{RequestClassifier, Route};
