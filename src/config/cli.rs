//! Command-line flags.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Parser)]
#[command(name = "lb-gateway")]
#[command(about = "Bridges Matrix client traffic onto a low-bandwidth transport", long_about = None)]
pub struct Cli {
    /// The HTTP listening address for the server [default: :8008]
    #[arg(long = "http-bind-addr")]
    pub http_bind_addr: Option<String>,

    /// The homeserver to forward inbound requests to, without a scheme, e.g. localhost:8008
    #[arg(long)]
    pub homeserver: Option<String>,

    /// Optional TOML file with gateway settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Bind address of the Prometheus metrics exporter
    #[arg(long = "metrics-addr")]
    pub metrics_addr: Option<String>,
}

impl Cli {
    /// Overlay flags that were given on top of file or default settings.
    pub fn merge_into(&self, config: &mut GatewayConfig) {
        if let Some(addr) = &self.http_bind_addr {
            config.listener.bind_address = addr.clone();
        }
        if let Some(homeserver) = &self.homeserver {
            config.homeserver = homeserver.clone();
        }
        if let Some(addr) = &self.metrics_addr {
            config.observability.metrics_address = Some(addr.clone());
        }
    }
}
