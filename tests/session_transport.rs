//! End-to-end tests for the session transport over real sockets.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use figma_mcp_proxy::config::ServerConfig;
use figma_mcp_proxy::session::SessionState;

mod common;
use common::{session_id_of, spawn_server, EchoEngine, SseClient, TestServer};

async fn echo_server(grace_ms: u64, keep_alive_secs: u64) -> TestServer {
    let mut config = ServerConfig::default();
    config.session.grace_period_ms = grace_ms;
    config.session.keep_alive_secs = keep_alive_secs;
    spawn_server(config, Arc::new(EchoEngine)).await
}

async fn post(url: &str, body: &str) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(url)
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn health_reports_ok() {
    let server = echo_server(10_000, 0).await;
    let response = reqwest::get(server.url("/health")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok", "service": "figma-mcp-proxy"}));
}

#[tokio::test]
async fn stream_starts_with_endpoint_handshake() {
    let server = echo_server(10_000, 0).await;
    let mut client = SseClient::connect(&server.url("/sse")).await;

    let headers = client.headers();
    assert_eq!(headers["content-type"], "text/event-stream");
    assert_eq!(headers["cache-control"], "no-cache");
    assert_eq!(headers["x-accel-buffering"], "no");

    let endpoint = client.endpoint().await;
    assert!(endpoint.starts_with("/message?sessionId="));
    let id = session_id_of(&endpoint);
    assert_eq!(id.len(), 32);

    let session = server.lifecycle.registry().get(&id).expect("session registered");
    assert_eq!(session.state(), SessionState::Active);
}

#[tokio::test]
async fn replies_arrive_in_acceptance_order() {
    let server = echo_server(10_000, 0).await;
    let mut client = SseClient::connect(&server.url("/sse")).await;
    let endpoint = client.endpoint().await;

    for n in 0..5 {
        let (status, body) = post(&server.url(&endpoint), &format!("m{n}")).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"received": true}));
    }

    for n in 0..5 {
        for part in 1..=2 {
            let event = client.next_event().await.unwrap();
            assert_eq!(event.data, format!("m{n}#{part}"));
        }
    }
}

#[tokio::test]
async fn sessions_are_isolated() {
    let server = echo_server(10_000, 0).await;
    let mut a = SseClient::connect(&server.url("/sse")).await;
    let mut b = SseClient::connect(&server.url("/sse")).await;
    let endpoint_a = a.endpoint().await;
    let endpoint_b = b.endpoint().await;
    assert_ne!(endpoint_a, endpoint_b);

    post(&server.url(&endpoint_b), "for-b").await;
    post(&server.url(&endpoint_a), "for-a").await;

    assert_eq!(a.next_event().await.unwrap().data, "for-a#1");
    assert_eq!(b.next_event().await.unwrap().data, "for-b#1");
}

#[tokio::test]
async fn bad_requests_are_rejected() {
    let server = echo_server(10_000, 0).await;
    let mut client = SseClient::connect(&server.url("/sse")).await;
    let endpoint = client.endpoint().await;

    let (status, body) = post(&server.url("/message"), "{}").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing sessionId");

    let (status, body) = post(&server.url(&endpoint), "").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Empty message body");
}

#[tokio::test]
async fn unknown_session_is_404_without_side_effects() {
    let server = echo_server(10_000, 0).await;
    let mut client = SseClient::connect(&server.url("/sse")).await;
    let id = session_id_of(&client.endpoint().await);

    let (status, body) = post(&server.url("/message?sessionId=nope"), "{}").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Session not found");
    assert_eq!(body["sessions"], json!([id]));

    // A truncated id is not a match either.
    let (status, _) = post(&server.url(&format!("/message?sessionId={}", &id[..8])), "{}").await;
    assert_eq!(status, 404);

    assert_eq!(server.lifecycle.registry().len(), 1);
}

#[tokio::test]
async fn alternate_id_sources_are_accepted() {
    let server = echo_server(10_000, 0).await;
    let mut client = SseClient::connect(&server.url("/sse")).await;
    let id = session_id_of(&client.endpoint().await);

    let (status, _) = post(&server.url(&format!("/message?connectionId={id}")), "q").await;
    assert_eq!(status, 200);

    let response = reqwest::Client::new()
        .post(server.url("/message"))
        .header("x-connection-id", &id)
        .body("h")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    assert_eq!(client.next_event().await.unwrap().data, "q#1");
    assert_eq!(client.next_event().await.unwrap().data, "q#2");
    assert_eq!(client.next_event().await.unwrap().data, "h#1");
}

#[tokio::test]
async fn disconnect_drains_then_removes_session() {
    // Keep-alives make the server notice the dropped connection.
    let server = echo_server(500, 1).await;
    let mut client = SseClient::connect(&server.url("/sse")).await;
    let endpoint = client.endpoint().await;
    let id = session_id_of(&endpoint);
    let session = server.lifecycle.registry().get(&id).unwrap();

    drop(client);

    let mut waited = Duration::ZERO;
    while session.state() == SessionState::Active {
        assert!(waited < Duration::from_secs(10), "disconnect never observed");
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }

    let mut waited = Duration::ZERO;
    while server.lifecycle.registry().get(&id).is_some() {
        assert!(waited < Duration::from_secs(5), "session never removed");
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }

    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.outbound().is_closed());

    let (status, _) = post(&server.url(&endpoint), "late").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn draining_session_still_accepts_messages() {
    let server = echo_server(60_000, 0).await;
    let mut client = SseClient::connect(&server.url("/sse")).await;
    let endpoint = client.endpoint().await;
    let id = session_id_of(&endpoint);

    let session = server.lifecycle.registry().get(&id).unwrap();
    server.lifecycle.disconnect(session.id());
    assert_eq!(session.state(), SessionState::Draining);

    let (status, _) = post(&server.url(&endpoint), "still here").await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn shutdown_ends_open_streams() {
    let server = echo_server(60_000, 0).await;
    let mut client = SseClient::connect(&server.url("/sse")).await;
    client.endpoint().await;

    server.shutdown.trigger();

    assert!(client.next_event().await.is_none());
    let result = tokio::time::timeout(common::WAIT, server.handle).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));
    assert!(server.lifecycle.registry().is_empty());
}
