//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, CORS, limits, timeouts)
//! - Bind server to listener
//! - Close every session when shutdown is signalled, so open event streams
//!   end and graceful shutdown can complete

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::engine::EngineFactory;
use crate::http::handlers::{self, AppState};
use crate::routing::MessageRouter;
use crate::session::{LifecycleManager, SessionRegistry};
use crate::transport::MESSAGE_PATH;

/// HTTP server for the session transport.
pub struct HttpServer {
    router: Router,
    lifecycle: LifecycleManager,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &ServerConfig, engines: Arc<dyn EngineFactory>) -> Self {
        let registry = SessionRegistry::new();
        let lifecycle = LifecycleManager::new(registry.clone(), engines, config.session.clone());

        let state = AppState {
            lifecycle: lifecycle.clone(),
            router: MessageRouter::new(registry),
            keep_alive: config.session.keep_alive(),
        };

        Self {
            router: Self::build_router(config, state),
            lifecycle,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request timeout only bounds `/message`: a stream response is
    /// produced immediately and then stays open for the life of the session.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let messages = Router::new().route(MESSAGE_PATH, post(handlers::post_message)).layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
        );

        let router = Router::new()
            .route("/health", get(handlers::health))
            .route("/sse", get(handlers::open_stream).post(handlers::open_stream))
            .merge(messages)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            );

        if config.security.cors_enabled {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let lifecycle = self.lifecycle.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, closing sessions");
                lifecycle.shutdown();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, ProtocolEngine};
    use crate::session::SessionId;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct Silent;

    #[async_trait]
    impl ProtocolEngine for Silent {
        async fn handle(&self, _raw: &str) -> Result<Vec<String>, EngineError> {
            Ok(Vec::new())
        }
    }

    impl EngineFactory for Silent {
        fn create(&self, _session_id: &SessionId) -> Box<dyn ProtocolEngine> {
            Box::new(Silent)
        }
    }

    fn server(config: &ServerConfig) -> HttpServer {
        HttpServer::new(config, Arc::new(Silent))
    }

    #[tokio::test]
    async fn health_carries_request_id() {
        let response = server(&ServerConfig::default())
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn oversized_message_is_rejected() {
        let mut config = ServerConfig::default();
        config.security.max_body_size = 16;
        let server = server(&config);
        let (session, _stream) = server.lifecycle().open();

        let request = Request::post(format!("/message?sessionId={}", session.id()))
            .body(Body::from("x".repeat(64)))
            .unwrap();
        let response = server.router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn message_for_unknown_session_is_not_found() {
        let request = Request::post("/message?sessionId=missing")
            .body(Body::from("{}"))
            .unwrap();
        let response = server(&ServerConfig::default())
            .router()
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stream_is_event_stream() {
        let server = server(&ServerConfig::default());
        let response = server
            .router()
            .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");
        assert_eq!(server.lifecycle().registry().len(), 1);
    }
}
