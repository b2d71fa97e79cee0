//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper connection, Axum router, request ID, timeouts)
//!     → routing (classify by path)
//!     → relay.rs  (media: stream to https://<origin host>)
//!     | bridge.rs (api: one BridgeRequest through the transport)
//!     → response.rs (PROXY envelopes for gateway-side failures)
//!     → Send to client
//! ```

pub mod bridge;
pub mod relay;
pub mod request;
pub mod response;
pub mod server;

pub use bridge::TransportBridge;
pub use relay::MediaRelay;
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::GatewayError;
pub use server::{AppState, HttpServer};
