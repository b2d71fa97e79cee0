//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs after CLI flags are merged, before anything is bound

use thiserror::Error;

use crate::config::homeserver::{Homeserver, HomeserverError};
use crate::config::schema::GatewayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("--http-bind-addr must be set")]
    EmptyBindAddress,

    #[error("`{0}` is not a valid bind address (expected host:port or :port)")]
    InvalidBindAddress(String),

    #[error(transparent)]
    Homeserver(#[from] HomeserverError),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,
}

/// Expand a Go-style `:port` bind address to all interfaces.
pub fn normalize_bind_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

fn check_bind_address(addr: &str) -> Result<(), ValidationError> {
    if addr.is_empty() {
        return Err(ValidationError::EmptyBindAddress);
    }
    let normalized = normalize_bind_address(addr);
    match normalized.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
        _ => Err(ValidationError::InvalidBindAddress(addr.to_string())),
    }
}

/// Validate the merged configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = check_bind_address(&config.listener.bind_address) {
        errors.push(e);
    }
    if let Err(e) = Homeserver::parse(&config.homeserver) {
        errors.push(e.into());
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    let timeouts = [
        ("read_secs", config.timeouts.read_secs),
        ("write_secs", config.timeouts.write_secs),
        ("idle_secs", config.timeouts.idle_secs),
        ("read_header_secs", config.timeouts.read_header_secs),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.homeserver = "localhost:8008".to_string();
        config
    }

    #[test]
    fn default_with_homeserver_is_valid() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = String::new();
        config.timeouts.idle_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyBindAddress));
        assert!(errors.contains(&ValidationError::Homeserver(HomeserverError::Empty)));
        assert!(errors.contains(&ValidationError::ZeroTimeout("idle_secs")));
    }

    #[test]
    fn bind_address_forms() {
        assert_eq!(normalize_bind_address(":8008"), "0.0.0.0:8008");
        assert!(check_bind_address(":8008").is_ok());
        assert!(check_bind_address("127.0.0.1:0").is_ok());
        assert!(check_bind_address("localhost:8008").is_ok());
        assert!(check_bind_address("8008").is_err());
        assert!(check_bind_address(":http").is_err());
    }
}
