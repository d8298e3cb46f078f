//! Shared utilities for integration testing.
#![allow(dead_code)]

use async_trait::async_trait;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use figma_mcp_proxy::config::{FigmaConfig, ServerConfig};
use figma_mcp_proxy::engine::{EngineError, EngineFactory, ProtocolEngine};
use figma_mcp_proxy::session::{LifecycleManager, SessionId};
use figma_mcp_proxy::transport::ENDPOINT_EVENT;
use figma_mcp_proxy::{HttpServer, Shutdown};

pub const WAIT: Duration = Duration::from_secs(5);

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request target (path and query) and returns the status
/// and body. Bodies for `.png` targets are served as `image/png`, everything
/// else as JSON.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    start_backend_with_headers(move |target| {
        let reply = f(target);
        async move {
            let (status, body) = reply.await;
            (status, body, Vec::new())
        }
    })
    .await
}

/// Like [`start_programmable_backend`], with extra response headers.
pub async fn start_backend_with_headers<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String, Vec<(&'static str, String)>)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (read, mut write) = socket.into_split();
                        let mut reader = BufReader::new(read);

                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).await.is_err() {
                            return;
                        }
                        // Drain headers; requests are bodiless GETs.
                        loop {
                            let mut line = String::new();
                            match reader.read_line(&mut line).await {
                                Ok(0) | Err(_) => break,
                                Ok(_) if line == "\r\n" => break,
                                Ok(_) => {}
                            }
                        }

                        let target = request_line
                            .split_whitespace()
                            .nth(1)
                            .unwrap_or("/")
                            .to_string();
                        let content_type = if target.ends_with(".png") {
                            "image/png"
                        } else {
                            "application/json"
                        };

                        let (status, body, headers) = f(target).await;
                        let status_text = match status {
                            200 => "200 OK",
                            403 => "403 Forbidden",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let extra: String = headers
                            .iter()
                            .map(|(name, value)| format!("{name}: {value}\r\n"))
                            .collect();
                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
                            status_text,
                            content_type,
                            body.len(),
                            extra,
                            body
                        );
                        let _ = write.write_all(response_str.as_bytes()).await;
                        let _ = write.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Figma settings pointed at a mock backend, with fast retries.
pub fn figma_config(backend: SocketAddr) -> FigmaConfig {
    FigmaConfig {
        api_base: format!("http://{backend}/v1"),
        access_token: "test-token".into(),
        timeout_secs: 5,
        max_retries: 1,
        retry_base_delay_ms: 10,
        retry_max_delay_ms: 20,
        ..FigmaConfig::default()
    }
}

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub lifecycle: LifecycleManager,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn spawn_server(mut config: ServerConfig, engines: Arc<dyn EngineFactory>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let server = HttpServer::new(&config, engines);
    let lifecycle = server.lifecycle().clone();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestServer {
        addr,
        lifecycle,
        shutdown,
        handle,
    }
}

/// Reads events off a live event stream. Keep-alive comments are skipped
/// by the parser.
pub struct SseClient {
    headers: reqwest::header::HeaderMap,
    events: BoxStream<'static, Result<Event, EventStreamError<reqwest::Error>>>,
}

impl SseClient {
    pub async fn connect(url: &str) -> Self {
        let response = reqwest::get(url).await.unwrap();
        assert_eq!(response.status(), 200);
        Self {
            headers: response.headers().clone(),
            events: response.bytes_stream().eventsource().boxed(),
        }
    }

    pub fn headers(&self) -> &reqwest::header::HeaderMap {
        &self.headers
    }

    /// Next event, or `None` once the stream ends.
    pub async fn next_event(&mut self) -> Option<Event> {
        tokio::time::timeout(WAIT, self.events.next())
            .await
            .expect("timed out waiting for an event")
            .map(|event| event.unwrap())
    }

    /// Consume the handshake and return the announced message path.
    pub async fn endpoint(&mut self) -> String {
        let event = self.next_event().await.expect("stream ended before handshake");
        assert_eq!(event.event, ENDPOINT_EVENT);
        event.data
    }
}

pub fn session_id_of(endpoint: &str) -> String {
    endpoint
        .split_once("sessionId=")
        .map(|(_, id)| id.to_string())
        .expect("endpoint carries a sessionId")
}

/// Replies to every message with two frames: `<raw>#1` and `<raw>#2`.
pub struct EchoEngine;

#[async_trait]
impl ProtocolEngine for EchoEngine {
    async fn handle(&self, raw: &str) -> Result<Vec<String>, EngineError> {
        Ok(vec![format!("{raw}#1"), format!("{raw}#2")])
    }
}

impl EngineFactory for EchoEngine {
    fn create(&self, _session_id: &SessionId) -> Box<dyn ProtocolEngine> {
        Box::new(EchoEngine)
    }
}
