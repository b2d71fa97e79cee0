//! lb-gateway
//!
//! Fronts a Matrix homeserver and re-exposes its client API over a
//! low-bandwidth, lossy transport.
//!
//! ```text
//!     Client Request     ┌──────────────────────────────────────────────────┐
//!     ───────────────────┼─▶ net listener ─▶ http server ─▶ routing         │
//!                        │                                    │             │
//!                        │                 media path ◀───────┴──▶ api path │
//!                        │                     │                     │      │
//!                        │                     ▼                     ▼      │
//!                        │               byte-stream relay    transport     │
//!                        │               (https origin)       bridge        │
//!     Client Response    │                     │                     │      │
//!     ◀──────────────────┼─────────────────────┴─────────────────────┘      │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use clap::Parser;

use lb_gateway::config::Cli;
use lb_gateway::lifecycle::signals::spawn_signal_handler;
use lb_gateway::lifecycle::startup::{self, Gateway, StartupError};
use lb_gateway::lifecycle::Shutdown;
use lb_gateway::observability::logging::init_logging;
use lb_gateway::transport::{HttpsTransport, Transport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "lb-gateway starting");

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!(error = %e, "Fatal error");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let config = startup::load(&cli)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        homeserver = %config.homeserver,
        max_connections = config.listener.max_connections,
        write_timeout_secs = config.timeouts.write_secs,
        "Configuration loaded"
    );

    let transport: Arc<dyn Transport> = Arc::new(HttpsTransport::new().map_err(StartupError::Transport)?);
    let gateway = Gateway::prepare(config, transport)?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    gateway.run(&shutdown).await
}
