//! Media relay behaviour against a live origin.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use lb_gateway::config::ListenerConfig;
use lb_gateway::net::Listener;
use lb_gateway::Shutdown;

mod common;

use common::{build_server, closed_addr, http_origin, start_echo_origin, MockTransport, Reply};

const DOWNLOAD: &str = "/_matrix/client/v1/media/download/hs.local/AbCdEf";

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn media_request_reaches_origin_unmodified() {
    let origin = start_echo_origin().await;
    let transport = MockTransport::new(Reply::Respond(200, "{}"));
    let server = build_server(transport.clone(), http_origin(origin));

    let request = Request::builder()
        .method("POST")
        .uri("/_matrix/client/v1/media/upload?filename=cat.png")
        .header(header::AUTHORIZATION, "Bearer XYZ")
        .header("x-custom", "kept")
        .body(Body::from("not really a png"))
        .unwrap();
    let response = server.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-origin").unwrap(), "echo");

    let seen = json_body(response).await;
    assert_eq!(seen["method"], "POST");
    assert_eq!(seen["path"], "/_matrix/client/v1/media/upload");
    assert_eq!(seen["query"], "filename=cat.png");
    assert_eq!(seen["host"], origin.to_string());
    assert_eq!(seen["authorization"], "Bearer XYZ");
    assert_eq!(seen["x_custom"], "kept");
    assert_eq!(seen["body"], "not really a png");
    assert!(seen["x_request_id"].is_string());

    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn federation_media_is_relayed_too() {
    let origin = start_echo_origin().await;
    let transport = MockTransport::new(Reply::Respond(200, "{}"));
    let server = build_server(transport.clone(), http_origin(origin));

    let request = Request::builder()
        .uri("/_matrix/federation/v1/media/download/AbCdEf")
        .body(Body::empty())
        .unwrap();
    let response = server.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["method"], "GET");
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn origin_status_passes_through() {
    let origin = start_echo_origin().await;
    let server = build_server(MockTransport::new(Reply::Fail), http_origin(origin));

    let request = Request::builder()
        .uri("/_matrix/client/v1/media/thumbnail/hs.local/missing")
        .body(Body::empty())
        .unwrap();
    let response = server.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers().get("x-origin").unwrap(), "echo");
}

#[tokio::test]
async fn unreachable_origin_is_bare_502() {
    let origin = closed_addr().await;
    let transport = MockTransport::new(Reply::Respond(200, "{}"));
    let server = build_server(transport.clone(), http_origin(origin));

    let request = Request::builder().uri(DOWNLOAD).body(Body::empty()).unwrap();
    let response = server.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(!body.starts_with(b"{\"errcode\""));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn dot_segments_never_reach_origin_as_another_endpoint() {
    let origin = start_echo_origin().await;
    let transport = MockTransport::new(Reply::Respond(200, r#"{"bridged":true}"#));
    let server = build_server(transport.clone(), http_origin(origin));

    for path in [
        "/_matrix/client/v1/media/../../v3/login",
        "/_matrix/client/v1/media/%2e%2e/%2e%2e/v3/login",
    ] {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = server.router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-origin").is_none());
        assert_eq!(json_body(response).await["bridged"], true);
        assert_eq!(
            transport.requests().last().unwrap().url,
            format!("//hs.local:8448{}", path)
        );
    }
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn served_over_socket_until_shutdown() {
    let origin = start_echo_origin().await;
    let transport = MockTransport::new(Reply::Respond(200, r#"{"versions":["v1.11"]}"#));
    let server = build_server(transport.clone(), http_origin(origin));

    let listener = Listener::bind(&ListenerConfig {
        bind_address: "127.0.0.1:0".to_string(),
        max_connections: 16,
    })
    .await
    .unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let client = reqwest::Client::new();

    let media = client
        .get(format!("http://{}{}", addr, DOWNLOAD))
        .send()
        .await
        .unwrap();
    assert_eq!(media.status(), 200);
    let seen: Value = media.json().await.unwrap();
    assert_eq!(seen["path"], DOWNLOAD);
    assert_eq!(seen["x_forwarded_for"], "127.0.0.1");

    let api = client
        .get(format!("http://{}/_matrix/client/versions", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(api.status(), 200);
    assert_eq!(api.headers().get("content-type").unwrap(), "application/json");
    assert_eq!(api.text().await.unwrap(), r#"{"versions":["v1.11"]}"#);
    assert_eq!(transport.requests().len(), 1);

    drop(client);
    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
