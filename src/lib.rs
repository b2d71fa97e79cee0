//! lb-gateway library
//!
//! Routing and bridging layer between plain HTTP clients and a
//! reliability-engineered transport towards a Matrix homeserver.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod transport;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
pub use transport::{Transport, TransportParams};
