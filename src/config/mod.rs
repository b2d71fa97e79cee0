//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional TOML file
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (flags win over file values)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! LB_* environment
//!     → overlay.rs (parse all, then one replace on the transport)
//!     → TransportParams (immutable for the process lifetime)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod homeserver;
pub mod loader;
pub mod overlay;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use homeserver::Homeserver;
pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::TimeoutConfig;
pub use schema::BridgeConfig;
pub use schema::ObservabilityConfig;
