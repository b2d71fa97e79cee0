//! Byte-stream relay for media requests.
//!
//! # Responsibilities
//! - Point the request at the homeserver origin and rewrite `Host`
//! - Stream request and response bodies without buffering
//! - Drop hop-by-hop headers in both directions
//!
//! # Design Decisions
//! - Redirects are passed to the client, never followed
//! - Origin failures are a bare 502, not a `PROXY` envelope
//! - The target is built from the raw path and query; a path the URL parser
//!   would rewrite is refused instead of forwarded somewhere else
//! - No overall client timeout: media bodies can take arbitrarily long

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::header::{HeaderValue, HOST};
use axum::http::{HeaderName, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::http::request::{request_id, strip_hop_by_hop};

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Errors building the relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("origin `{0}` has no host")]
    MissingHost(Url),

    #[error("origin host `{0}` is not a valid Host header")]
    InvalidHost(String),

    #[error("cannot build origin client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Single-origin streaming reverse proxy.
pub struct MediaRelay {
    /// `scheme://authority` of the origin, without a trailing slash.
    base: String,
    host: HeaderValue,
    client: reqwest::Client,
}

impl MediaRelay {
    /// Relay to `origin` (scheme, host and optional port are used).
    pub fn new(origin: Url) -> Result<Self, RelayError> {
        let host_str = origin
            .host_str()
            .ok_or_else(|| RelayError::MissingHost(origin.clone()))?;
        let authority = match origin.port() {
            Some(port) => format!("{}:{}", host_str, port),
            None => host_str.to_string(),
        };
        let base = format!("{}://{}", origin.scheme(), authority);
        let host = HeaderValue::from_str(&authority).map_err(|_| RelayError::InvalidHost(authority))?;

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            base,
            host,
            client,
        })
    }

    /// Origin URL for a request, or `None` when the path would not survive
    /// parsing unchanged.
    fn target(&self, uri: &Uri) -> Option<Url> {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        let target = Url::parse(&format!("{}{}", self.base, path_and_query)).ok()?;
        (target.path() == uri.path()).then_some(target)
    }

    /// Relay one request, streaming both ways.
    pub async fn forward(&self, request: Request<Body>, client_addr: Option<SocketAddr>) -> Response {
        let request_id = request_id(&request).to_string();
        let (parts, body) = request.into_parts();

        let Some(target) = self.target(&parts.uri) else {
            tracing::warn!(request_id = %request_id, path = %parts.uri.path(), "Media path cannot be forwarded unmodified");
            return StatusCode::BAD_REQUEST.into_response();
        };

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.insert(HOST, self.host.clone());
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut headers, addr);
        }

        tracing::debug!(
            request_id = %request_id,
            method = %parts.method,
            target = %target,
            "Relaying media request"
        );

        let upstream = self
            .client
            .request(parts.method, target)
            .headers(headers)
            .body(reqwest::Body::wrap_stream(body.into_data_stream()))
            .send()
            .await;

        let upstream = match upstream {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Origin request failed");
                return StatusCode::BAD_GATEWAY.into_response();
            }
        };

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        response
    }
}

fn append_forwarded_for(headers: &mut axum::http::HeaderMap, addr: SocketAddr) {
    let ip = addr.ip().to_string();
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.is_empty() => format!("{}, {}", prior, ip),
        _ => ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
