//! Startup orchestration.
//!
//! # Responsibilities
//! - Load, merge and validate configuration
//! - Compile the classifier and apply the transport overlay
//! - Build the relay, bridge and server, then bind and serve
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Nothing is bound until every check has passed
//! - Shared state is built once here and never mutated afterwards

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::homeserver::HomeserverError;
use crate::config::loader::{load_config, ConfigError};
use crate::config::overlay::{apply_overrides_with, OverlayError};
use crate::config::validation::validate_config;
use crate::config::{Cli, GatewayConfig, Homeserver};
use crate::http::relay::RelayError;
use crate::http::{AppState, HttpServer, MediaRelay, TransportBridge};
use crate::lifecycle::shutdown::Shutdown;
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;
use crate::routing::RequestClassifier;
use crate::transport::{Transport, TransportParams};

/// Errors that stop the gateway before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Homeserver(#[from] HomeserverError),

    #[error("cannot compile media path pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("cannot build transport: {0}")]
    Transport(#[source] reqwest::Error),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("`{0}` is not a valid metrics address")]
    MetricsAddress(String),

    #[error("cannot start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Resolve the effective configuration from flags and the optional file.
pub fn load(cli: &Cli) -> Result<GatewayConfig, StartupError> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = load_config(path)?;
            tracing::info!(path = %path.display(), "Configuration file loaded");
            config
        }
        None => GatewayConfig::default(),
    };
    cli.merge_into(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// A fully built gateway, ready to bind.
pub struct Gateway {
    config: GatewayConfig,
    homeserver: Homeserver,
    params: TransportParams,
    server: HttpServer,
}

impl Gateway {
    /// Build the gateway, overlaying the process environment on `transport`.
    pub fn prepare(config: GatewayConfig, transport: Arc<dyn Transport>) -> Result<Self, StartupError> {
        Self::prepare_with(config, transport, |name| std::env::var(name).ok())
    }

    /// Build the gateway with an explicit override lookup.
    pub fn prepare_with<F>(
        config: GatewayConfig,
        transport: Arc<dyn Transport>,
        lookup: F,
    ) -> Result<Self, StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let homeserver = Homeserver::parse(&config.homeserver)?;
        let classifier = RequestClassifier::new()?;
        let params = apply_overrides_with(transport.as_ref(), lookup)?;

        let write_timeout = Duration::from_secs(config.timeouts.write_secs);
        let worst_case = params.worst_case_delivery();
        if write_timeout < worst_case {
            tracing::warn!(
                write_timeout = ?write_timeout,
                worst_case_delivery = ?worst_case,
                "Write timeout is shorter than the transport's retry budget; bridged requests may be cut off"
            );
        }

        let relay = MediaRelay::new(homeserver.origin().clone())?;
        let bridge = TransportBridge::new(
            transport,
            &homeserver,
            &config.bridge,
            Duration::from_secs(config.timeouts.read_secs),
        );

        let state = AppState {
            classifier: Arc::new(classifier),
            relay: Arc::new(relay),
            bridge: Arc::new(bridge),
        };
        let server = HttpServer::new(state, &config.timeouts);

        Ok(Self {
            config,
            homeserver,
            params,
            server,
        })
    }

    pub fn homeserver(&self) -> &Homeserver {
        &self.homeserver
    }

    /// Effective transport parameters.
    pub fn params(&self) -> &TransportParams {
        &self.params
    }

    /// Bind the listener and serve until `shutdown` fires.
    pub async fn run(self, shutdown: &Shutdown) -> Result<(), StartupError> {
        let shutdown_rx = shutdown.subscribe();

        if let Some(addr) = &self.config.observability.metrics_address {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|_| StartupError::MetricsAddress(addr.clone()))?;
            metrics::init_metrics(addr)?;
        }

        let listener = Listener::bind(&self.config.listener).await?;
        tracing::info!(
            bind_address = %self.config.listener.bind_address,
            homeserver = %self.homeserver.address(),
            "Listening and forwarding to homeserver"
        );

        self.server
            .run(listener, shutdown_rx)
            .await
            .map_err(StartupError::Serve)
    }
}
