//! Reference transport that delivers bridge requests over HTTPS.
//!
//! # Responsibilities
//! - Map `TransportParams` onto an outbound HTTPS client
//! - Retransmit on connect failures and ack timeouts with backoff
//!
//! The ack timeout bounds how long an attempt may wait for the homeserver to
//! accept the connection. Once accepted, the response may take as long as it
//! needs (long-poll `/sync`); the gateway's write timeout bounds it.
//! - Swap parameters and client together when `set_params` is called
//!
//! # Design Decisions
//! - Parameters and client live in one `ArcSwap` cell so a request never
//!   sees a client built from other parameters
//! - Any HTTP response is returned as-is; status codes are not interpreted

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::resilience::backoff::{calculate_backoff, MAX_BACKOFF};
use crate::resilience::retries::{is_retryable, AttemptFailure};
use crate::transport::{BridgeRequest, BridgeResponse, Transport, TransportError, TransportParams};

struct Engine {
    params: TransportParams,
    client: reqwest::Client,
}

impl Engine {
    fn build(params: TransportParams) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(params.insecure_skip_verify)
            .connect_timeout(params.ack_timeout())
            .tcp_keepalive(Duration::from_secs(params.heartbeat_timeout_secs.max(1)))
            .pool_idle_timeout(Duration::from_secs(params.keep_alive_timeout_secs.max(1)))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { params, client })
    }
}

/// HTTPS delivery with the retry behaviour described by `TransportParams`.
pub struct HttpsTransport {
    engine: ArcSwap<Engine>,
}

impl HttpsTransport {
    /// Create a transport with engine default parameters.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_params(TransportParams::default())
    }

    pub fn with_params(params: TransportParams) -> Result<Self, reqwest::Error> {
        let engine = Engine::build(params)?;
        Ok(Self {
            engine: ArcSwap::from_pointee(engine),
        })
    }

    /// Resolve the scheme-relative bridge URL against `https`.
    fn target_url(url: &str) -> Result<reqwest::Url, TransportError> {
        let absolute = if url.starts_with("//") {
            format!("https:{}", url)
        } else {
            url.to_string()
        };
        reqwest::Url::parse(&absolute).map_err(|_| TransportError::InvalidDestination(url.to_string()))
    }

    fn build_attempt(
        engine: &Engine,
        target: &reqwest::Url,
        request: &BridgeRequest,
    ) -> reqwest::RequestBuilder {
        let mut builder = engine.client.request(request.method.clone(), target.clone());

        if !request.token.is_empty() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", request.token));
        }
        if !request.body.is_empty() {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(request.body.clone());
        }
        builder
    }
}

#[async_trait]
impl Transport for HttpsTransport {
    fn params(&self) -> TransportParams {
        self.engine.load().params.clone()
    }

    fn set_params(&self, params: TransportParams) {
        match Engine::build(params) {
            Ok(engine) => self.engine.store(Arc::new(engine)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to rebuild transport client, keeping previous parameters");
            }
        }
    }

    async fn send_request(&self, request: BridgeRequest) -> Result<BridgeResponse, TransportError> {
        let engine = self.engine.load_full();
        let target = Self::target_url(&request.url)?;
        let max_attempts = engine.params.transmission_max_retransmits.saturating_add(1);
        let base_delay = Duration::from_secs(engine.params.flight_interval_secs);

        let mut attempts = 0;
        loop {
            attempts += 1;

            let (kind, error) = match Self::build_attempt(&engine, &target, &request).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match response.bytes().await {
                        Ok(body) => return Ok(BridgeResponse { status, body }),
                        Err(e) => {
                            tracing::warn!(attempt = attempts, error = %e, "Failed reading homeserver response");
                            (AttemptFailure::from_reqwest(&e), e)
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt = attempts, url = %target, error = %e, "Delivery attempt failed");
                    (AttemptFailure::from_reqwest(&e), e)
                }
            };

            if attempts >= max_attempts || !is_retryable(&request.method, kind) {
                return Err(match kind {
                    AttemptFailure::Timeout => TransportError::Timeout { attempts },
                    AttemptFailure::Connect if error.is_timeout() => TransportError::Timeout { attempts },
                    AttemptFailure::Connect => TransportError::Unreachable(error.to_string()),
                    AttemptFailure::Other => TransportError::Exhausted {
                        attempts,
                        reason: error.to_string(),
                    },
                });
            }

            let delay = calculate_backoff(attempts, base_delay, MAX_BACKOFF);
            tracing::debug!(attempt = attempts, delay = ?delay, "Retransmitting request");
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use bytes::Bytes;

    #[test]
    fn scheme_relative_urls_resolve_to_https() {
        let url = HttpsTransport::target_url("//matrix.example.org:8448/_matrix/client/v3/sync?since=s1").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("matrix.example.org"));
        assert_eq!(url.port(), Some(8448));
        assert_eq!(url.query(), Some("since=s1"));
    }

    #[test]
    fn unparsable_destination_is_rejected() {
        let err = HttpsTransport::target_url("//:not a host/").unwrap_err();
        assert_eq!(err.kind(), "invalid_destination");
    }

    #[tokio::test]
    async fn set_params_replaces_engine() {
        let transport = HttpsTransport::new().unwrap();
        assert_eq!(transport.params(), TransportParams::default());

        let updated = TransportParams {
            observe_enabled: true,
            transmission_max_retransmits: 9,
            ..TransportParams::default()
        };
        transport.set_params(updated.clone());
        assert_eq!(transport.params(), updated);
    }

    #[tokio::test]
    async fn slow_response_outlives_ack_timeout() {
        let app = axum::Router::new().fallback(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            r#"{"next_batch":"s1"}"#
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let transport = HttpsTransport::with_params(TransportParams {
            transmission_ack_timeout_secs: 1,
            transmission_max_retransmits: 0,
            ..TransportParams::default()
        })
        .unwrap();

        let response = transport
            .send_request(BridgeRequest {
                method: Method::GET,
                url: format!("http://{}/_matrix/client/v3/sync?timeout=2000", addr),
                token: "XYZ".to_string(),
                body: Bytes::new(),
            })
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Bytes::from_static(br#"{"next_batch":"s1"}"#));
    }

    #[tokio::test]
    async fn unreachable_homeserver_is_an_error() {
        let transport = HttpsTransport::with_params(TransportParams {
            transmission_max_retransmits: 0,
            transmission_ack_timeout_secs: 1,
            ..TransportParams::default()
        })
        .unwrap();

        // Port 9 on localhost is closed in test environments.
        let result = transport
            .send_request(BridgeRequest {
                method: Method::GET,
                url: "//127.0.0.1:9/_matrix/client/versions".to_string(),
                token: String::new(),
                body: Bytes::new(),
            })
            .await;
        assert!(result.is_err());
    }
}
