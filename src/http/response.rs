//! Gateway-originated error responses.
//!
//! Only failures produced by the gateway itself use the `PROXY` errcode;
//! origin and transport responses pass through untouched.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

pub const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

const PROXY_ERRCODE: &str = "PROXY";

/// Per-request failures of the transport bridge.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GatewayError {
    /// The inbound body could not be drained.
    #[error("cannot read request body")]
    BodyRead,

    /// The transport could not deliver the request.
    #[error("failed to forward request to homeserver")]
    Forward,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    errcode: &'a str,
    error: &'a str,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::BodyRead => StatusCode::BAD_REQUEST,
            GatewayError::Forward => StatusCode::BAD_GATEWAY,
        }
    }

    /// JSON body, e.g. `{"errcode":"PROXY","error":"cannot read request body"}`.
    pub fn body(&self) -> String {
        let message = self.to_string();
        let envelope = ErrorEnvelope {
            errcode: PROXY_ERRCODE,
            error: &message,
        };
        serde_json::to_string(&envelope).unwrap_or_default()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), [(CONTENT_TYPE, APPLICATION_JSON)], self.body()).into_response()
    }
}
