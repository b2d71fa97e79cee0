//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::Router;
use bytes::Bytes;
use tokio::net::TcpListener;
use url::Url;

use lb_gateway::config::{BridgeConfig, Homeserver, TimeoutConfig};
use lb_gateway::http::{AppState, HttpServer, MediaRelay, TransportBridge};
use lb_gateway::routing::RequestClassifier;
use lb_gateway::transport::{BridgeRequest, BridgeResponse, Transport, TransportError, TransportParams};

pub const HOMESERVER: &str = "hs.local:8448";

/// What the mock transport answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(u16, &'static str),
    Fail,
}

/// Transport that records everything it is asked to do.
pub struct MockTransport {
    params: Mutex<TransportParams>,
    set_params_calls: AtomicUsize,
    requests: Mutex<Vec<BridgeRequest>>,
    reply: Reply,
}

impl MockTransport {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            params: Mutex::new(TransportParams::default()),
            set_params_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            reply,
        })
    }

    pub fn set_params_calls(&self) -> usize {
        self.set_params_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<BridgeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn params(&self) -> TransportParams {
        self.params.lock().unwrap().clone()
    }

    fn set_params(&self, params: TransportParams) {
        self.set_params_calls.fetch_add(1, Ordering::SeqCst);
        *self.params.lock().unwrap() = params;
    }

    async fn send_request(&self, request: BridgeRequest) -> Result<BridgeResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            Reply::Respond(status, body) => Ok(BridgeResponse {
                status: *status,
                body: Bytes::from_static(body.as_bytes()),
            }),
            Reply::Fail => Err(TransportError::Timeout { attempts: 5 }),
        }
    }
}

/// Build a gateway server whose media relay points at `origin`.
pub fn build_server(transport: Arc<MockTransport>, origin: Url) -> HttpServer {
    build_server_with(transport, origin, BridgeConfig::default())
}

pub fn build_server_with(transport: Arc<MockTransport>, origin: Url, bridge: BridgeConfig) -> HttpServer {
    let homeserver = Homeserver::parse(HOMESERVER).unwrap();
    let timeouts = TimeoutConfig::default();
    let state = AppState {
        classifier: Arc::new(RequestClassifier::new().unwrap()),
        relay: Arc::new(MediaRelay::new(origin).unwrap()),
        bridge: Arc::new(TransportBridge::new(
            transport,
            &homeserver,
            &bridge,
            Duration::from_secs(timeouts.read_secs),
        )),
    };
    HttpServer::new(state, &timeouts)
}

/// Origin that describes the request it received as JSON.
pub async fn start_echo_origin() -> SocketAddr {
    let app = Router::new().fallback(echo);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let described = serde_json::json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "host": header("host"),
        "authorization": header("authorization"),
        "x_custom": header("x-custom"),
        "x_forwarded_for": header("x-forwarded-for"),
        "x_request_id": header("x-request-id"),
        "body": String::from_utf8_lossy(&body),
    });

    let status = if parts.uri.path().ends_with("/missing") {
        axum::http::StatusCode::NOT_FOUND
    } else {
        axum::http::StatusCode::OK
    };
    (
        status,
        [("content-type", "application/json"), ("x-origin", "echo")],
        described.to_string(),
    )
        .into_response()
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn http_origin(addr: SocketAddr) -> Url {
    Url::parse(&format!("http://{}", addr)).unwrap()
}
