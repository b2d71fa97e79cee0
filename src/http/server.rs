//! HTTP server setup and connection serving.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler
//! - Wire up middleware (tracing, request ID, write timeout)
//! - Serve each accepted connection with hyper, applying header/idle timeouts
//! - Dispatch requests to the relay or the bridge
//! - Drain connections on shutdown

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::TimeoutConfig;
use crate::http::bridge::TransportBridge;
use crate::http::relay::MediaRelay;
use crate::http::request::{request_id, MakeRequestUuid};
use crate::net::connection::ConnectionTracker;
use crate::net::listener::Listener;
use crate::observability::metrics;
use crate::routing::{RequestClassifier, Route};

/// Time allowed for in-flight connections to finish after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<RequestClassifier>,
    pub relay: Arc<MediaRelay>,
    pub bridge: Arc<TransportBridge>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    header_timeout: Duration,
}

impl HttpServer {
    /// Create a new HTTP server from its startup-built parts.
    pub fn new(state: AppState, timeouts: &TimeoutConfig) -> Self {
        let router = Self::build_router(timeouts, state);
        // hyper's header timer also runs while a keep-alive connection waits
        // for its next request, so it doubles as the idle timeout.
        let header_timeout = Duration::from_secs(timeouts.read_header_secs.min(timeouts.idle_secs));
        Self {
            router,
            header_timeout,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(timeouts: &TimeoutConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(timeouts.write_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain connections.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let tracker = ConnectionTracker::new();

        loop {
            let (stream, peer_addr, permit) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            };

            let router = self.router.clone();
            let guard = tracker.track();
            let mut drain = tracker.drain_receiver();
            let header_timeout = self.header_timeout;

            tokio::spawn(async move {
                let _permit = permit;
                let connection_id = guard.id();

                let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
                    request.extensions_mut().insert(ConnectInfo(peer_addr));
                    router.clone().oneshot(request)
                });

                let mut builder = auto::Builder::new(TokioExecutor::new());
                builder
                    .http1()
                    .timer(TokioTimer::new())
                    .header_read_timeout(header_timeout);

                let conn = builder.serve_connection(TokioIo::new(stream), service);
                tokio::pin!(conn);

                let result = tokio::select! {
                    result = conn.as_mut() => result,
                    _ = drain.changed() => {
                        conn.as_mut().graceful_shutdown();
                        conn.as_mut().await
                    }
                };

                if let Err(e) = result {
                    tracing::debug!(connection_id = %connection_id, peer_addr = %peer_addr, error = %e, "Connection ended with error");
                }
                drop(guard);
            });
        }

        tracker.begin_drain();
        if tokio::time::timeout(DRAIN_TIMEOUT, tracker.wait_for_drain()).await.is_err() {
            tracing::warn!(
                remaining = tracker.active_count(),
                "Drain deadline reached with connections still open"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main gateway handler.
/// Classifies the request and hands it to the relay or the bridge.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request).to_string();
    let route = state.classifier.classify(request.uri().path());

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        route = %route,
        "Routing request"
    );

    let response = match route {
        Route::Media => {
            let client_addr = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0);
            state.relay.forward(request, client_addr).await
        }
        Route::Api => state
            .bridge
            .forward(request)
            .await
            .unwrap_or_else(IntoResponse::into_response),
    };

    let status = response.status().as_u16();
    tracing::debug!(request_id = %request_id, route = %route, status, "Request complete");
    metrics::record_request(route.as_str(), status, start_time);
    response
}
