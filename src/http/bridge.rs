//! Transport bridge for non-media requests.
//!
//! # Responsibilities
//! - Collapse an HTTP request into one `BridgeRequest`
//! - Await the transport's outcome
//! - Turn the outcome, or its absence, back into an HTTP response
//!
//! # Design Decisions
//! - Bodies are buffered: the transport is message-oriented, not streaming
//! - No submission happens unless the whole body was read
//! - Every response from this path is `application/json`

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, StatusCode, Uri};
use axum::response::Response;

use crate::config::{BridgeConfig, Homeserver};
use crate::http::request::{bearer_token, request_id};
use crate::http::response::{GatewayError, APPLICATION_JSON};
use crate::observability::metrics;
use crate::transport::{BridgeRequest, Transport};

/// Forwards API requests through the transport engine.
pub struct TransportBridge {
    transport: Arc<dyn Transport>,
    destination: String,
    read_timeout: Duration,
    max_body_bytes: usize,
}

impl TransportBridge {
    pub fn new(
        transport: Arc<dyn Transport>,
        homeserver: &Homeserver,
        config: &BridgeConfig,
        read_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            destination: homeserver.address().to_string(),
            read_timeout,
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Scheme-relative URL naming the homeserver as destination.
    pub fn target_url(&self, uri: &Uri) -> String {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        format!("//{}{}", self.destination, path_and_query)
    }

    /// Bridge one request.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response, GatewayError> {
        let request_id = request_id(&request).to_string();
        let (parts, body) = request.into_parts();

        let token = bearer_token(&parts.headers);
        let url = self.target_url(&parts.uri);

        let body = match tokio::time::timeout(
            self.read_timeout,
            axum::body::to_bytes(body, self.max_body_bytes),
        )
        .await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                tracing::warn!(request_id = %request_id, error = %e, "Cannot read request body");
                return Err(GatewayError::BodyRead);
            }
            Err(_) => {
                tracing::warn!(request_id = %request_id, timeout = ?self.read_timeout, "Timed out reading request body");
                return Err(GatewayError::BodyRead);
            }
        };

        tracing::debug!(
            request_id = %request_id,
            method = %parts.method,
            url = %url,
            body_len = body.len(),
            "Submitting request to transport"
        );

        let outcome = self
            .transport
            .send_request(BridgeRequest {
                method: parts.method,
                url,
                token,
                body,
            })
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(request_id = %request_id, kind = e.kind(), error = %e, "Transport failed to deliver request");
                metrics::record_bridge_failure(e.kind());
                return Err(GatewayError::Forward);
            }
        };

        let Ok(status) = StatusCode::from_u16(outcome.status) else {
            tracing::error!(request_id = %request_id, status = outcome.status, "Transport returned an invalid status code");
            metrics::record_bridge_failure("invalid_status");
            return Err(GatewayError::Forward);
        };

        let mut response = Response::new(Body::from(outcome.body));
        *response.status_mut() = status;
        response.headers_mut().insert(CONTENT_TYPE, APPLICATION_JSON);
        Ok(response)
    }
}
