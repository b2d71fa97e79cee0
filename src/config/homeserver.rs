//! Homeserver address parsing and the derived origin target.

use std::str::FromStr;

use axum::http::uri::Authority;
use thiserror::Error;
use url::Url;

/// Errors for a homeserver address that cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HomeserverError {
    #[error("--homeserver must be set")]
    Empty,

    #[error("`{0}` not a valid host: {1}")]
    InvalidAddress(String, &'static str),

    #[error("`https://{0}` not a valid URL: {1}")]
    InvalidOrigin(String, String),
}

/// The configured homeserver destination.
///
/// `address` is passed verbatim to the transport as the destination
/// identity; `origin` is the secure URL the media relay talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Homeserver {
    address: String,
    host: String,
    port: u16,
    origin: Url,
}

impl Homeserver {
    /// Parse a `host:port` address.
    pub fn parse(address: &str) -> Result<Self, HomeserverError> {
        if address.is_empty() {
            return Err(HomeserverError::Empty);
        }
        let invalid = |reason| HomeserverError::InvalidAddress(address.to_string(), reason);

        if address.contains('@') || address.contains('/') {
            return Err(invalid("expected host:port without scheme or path"));
        }
        let authority = Authority::from_str(address).map_err(|_| invalid("unparsable authority"))?;
        let port = authority.port_u16().ok_or_else(|| invalid("missing port in address"))?;
        let host = authority.host();
        if host.is_empty() {
            return Err(invalid("missing host in address"));
        }

        let origin = Url::parse(&format!("https://{}", host))
            .map_err(|e| HomeserverError::InvalidOrigin(host.to_string(), e.to_string()))?;

        Ok(Self {
            address: address.to_string(),
            host: host.to_string(),
            port,
            origin,
        })
    }

    /// The raw configured address.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Secure origin of the homeserver (host only, default port).
    pub fn origin(&self) -> &Url {
        &self.origin
    }
}
