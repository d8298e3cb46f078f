//! Session lifecycle: open, disconnect, deferred teardown.
//!
//! # Responsibilities
//! - Create sessions with their channel, engine and inbound worker
//! - Move a session to `Draining` when its stream goes away
//! - Tear it down after the grace interval, exactly once
//! - Close every session on process shutdown
//!
//! Teardown order is fixed: state to `Closed`, channel `close()`, registry
//! removal, cancellation of any pending cleanup.

use dashmap::DashMap;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::config::SessionConfig;
use crate::engine::jsonrpc::{self, ErrorObject, Response};
use crate::engine::{EngineError, EngineFactory, ProtocolEngine};
use crate::observability::metrics;
use crate::session::{Session, SessionId, SessionRegistry, SessionState};
use crate::transport::{EventStream, OutboundChannel};

struct Inner {
    registry: SessionRegistry,
    engines: Arc<dyn EngineFactory>,
    config: SessionConfig,
    cleanups: DashMap<SessionId, AbortHandle>,
}

/// Owns every session state transition.
#[derive(Clone)]
pub struct LifecycleManager {
    inner: Arc<Inner>,
}

impl LifecycleManager {
    pub fn new(
        registry: SessionRegistry,
        engines: Arc<dyn EngineFactory>,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                engines,
                config,
                cleanups: DashMap::new(),
            }),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    /// Open a new session and return the body of its streaming response.
    ///
    /// Dropping the returned stream counts as a transport disconnect.
    pub fn open(&self) -> (Arc<Session>, EventStream) {
        let config = &self.inner.config;
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_queue.max(1));

        let (session, mut stream) = self.inner.registry.create(|id| {
            let (outbound, stream) = OutboundChannel::open(id.clone(), config.outbound_buffer);
            (Session::new(id, outbound, inbound_tx), stream)
        });
        let id = session.id().clone();

        let engine = self.inner.engines.create(&id);
        tokio::spawn(run_inbound(
            id.clone(),
            engine,
            inbound_rx,
            session.outbound().clone(),
        ));

        let dropped = stream.notify_on_drop();
        let manager = self.clone();
        let watched = id.clone();
        tokio::spawn(async move {
            let _ = dropped.await;
            manager.disconnect(&watched);
        });

        metrics::record_session_opened(self.inner.registry.len());
        tracing::info!(session_id = %id, "Session opened");

        (session, stream)
    }

    /// Transport disconnect. Starts the grace interval for an active
    /// session; ignored in any other state.
    pub fn disconnect(&self, id: &SessionId) {
        let Some(session) = self.inner.registry.get(id.as_str()) else {
            return;
        };
        if !session.begin_draining() {
            return;
        }

        let grace = self.inner.config.grace_period();
        tracing::info!(
            session_id = %id,
            grace_ms = grace.as_millis() as u64,
            "Stream disconnected, draining session"
        );

        let manager = self.clone();
        let scheduled = id.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            manager.inner.cleanups.remove(&scheduled);
            manager.teardown(&scheduled);
        });
        self.inner.cleanups.insert(id.clone(), task.abort_handle());

        // The cleanup may already have run before its handle was stored.
        if session.state() == SessionState::Closed {
            self.inner.cleanups.remove(id);
        }
    }

    /// Move a session to `Closed` and release it. Returns true only for the
    /// call that performed the teardown.
    pub fn teardown(&self, id: &SessionId) -> bool {
        let Some(session) = self.inner.registry.get(id.as_str()) else {
            return false;
        };
        if !session.mark_closed() {
            return false;
        }

        session.outbound().close();
        self.inner.registry.remove(id.as_str());
        if let Some((_, pending)) = self.inner.cleanups.remove(id) {
            pending.abort();
        }

        metrics::record_session_closed(self.inner.registry.len(), session.age());
        tracing::info!(session_id = %id, "Session closed");
        true
    }

    /// Close every live session.
    pub fn shutdown(&self) {
        let ids = self.inner.registry.ids();
        tracing::info!(sessions = ids.len(), "Closing all sessions");
        for id in ids {
            self.teardown(&id);
        }
    }
}

/// Feeds one session's inbound messages to its engine, in acceptance order.
async fn run_inbound(
    id: SessionId,
    engine: Box<dyn ProtocolEngine>,
    mut inbound: mpsc::Receiver<String>,
    outbound: OutboundChannel,
) {
    loop {
        let raw = tokio::select! {
            biased;
            _ = outbound.closed() => break,
            next = inbound.recv() => match next {
                Some(raw) => raw,
                None => break,
            },
        };

        let replies = match AssertUnwindSafe(engine.handle(&raw)).catch_unwind().await {
            Ok(Ok(replies)) => replies,
            Ok(Err(err)) => {
                tracing::warn!(session_id = %id, error = %err, "Engine failed to handle message");
                vec![engine_failure_reply(&raw, &err)]
            }
            Err(_) => {
                tracing::error!(session_id = %id, "Engine panicked while handling message");
                vec![engine_failure_reply(&raw, &EngineError::Panicked)]
            }
        };

        for reply in replies {
            if let Err(err) = outbound.send(reply).await {
                tracing::debug!(session_id = %id, error = %err, "Dropping reply");
            }
        }
    }

    tracing::debug!(session_id = %id, "Inbound worker stopped");
}

fn engine_failure_reply(raw: &str, err: &EngineError) -> String {
    let id = jsonrpc::extract_id(raw).unwrap_or(serde_json::Value::Null);
    Response::failure(id, ErrorObject::internal(err.to_string())).to_json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelError;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::response::sse::Sse;
    use axum::response::IntoResponse;
    use http_body_util::BodyExt;
    use std::time::Duration;

    struct Echo;

    #[async_trait]
    impl ProtocolEngine for Echo {
        async fn handle(&self, raw: &str) -> Result<Vec<String>, EngineError> {
            match raw {
                "panic" => panic!("boom"),
                "fail" => Err(EngineError::Internal("nope".into())),
                _ => Ok(vec![format!("echo:{raw}")]),
            }
        }
    }

    struct EchoFactory;

    impl EngineFactory for EchoFactory {
        fn create(&self, _session_id: &SessionId) -> Box<dyn ProtocolEngine> {
            Box::new(Echo)
        }
    }

    fn manager(grace_ms: u64) -> LifecycleManager {
        let config = SessionConfig {
            grace_period_ms: grace_ms,
            ..SessionConfig::default()
        };
        LifecycleManager::new(SessionRegistry::new(), Arc::new(EchoFactory), config)
    }

    fn into_body(stream: EventStream) -> Body {
        Sse::new(stream).into_response().into_body()
    }

    async fn next_text(body: &mut Body) -> Option<String> {
        let frame = body.frame().await?.unwrap();
        Some(String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap())
    }

    #[tokio::test]
    async fn opened_session_is_active_and_registered() {
        let manager = manager(1000);
        let (session, stream) = manager.open();
        let mut stream = into_body(stream);

        assert_eq!(session.state(), SessionState::Active);
        assert!(manager.registry().get(session.id().as_str()).is_some());

        let handshake = next_text(&mut stream).await.unwrap();
        assert_eq!(
            handshake,
            format!("event: endpoint\ndata: /message?sessionId={}\n\n", session.id())
        );
    }

    #[tokio::test]
    async fn replies_follow_acceptance_order() {
        let manager = manager(1000);
        let (session, stream) = manager.open();
        let mut stream = into_body(stream);
        next_text(&mut stream).await.unwrap();

        for n in 0..5 {
            session.deliver(n.to_string()).await.unwrap();
        }
        for n in 0..5 {
            assert_eq!(next_text(&mut stream).await.unwrap(), format!("data: echo:{n}\n\n"));
        }
    }

    #[tokio::test]
    async fn engine_failures_become_error_replies() {
        let manager = manager(1000);
        let (session, stream) = manager.open();
        let mut stream = into_body(stream);
        next_text(&mut stream).await.unwrap();

        session.deliver("panic".into()).await.unwrap();
        session.deliver("fail".into()).await.unwrap();
        session.deliver("still alive".into()).await.unwrap();

        let panicked = next_text(&mut stream).await.unwrap();
        assert!(panicked.contains("-32603"));
        assert!(panicked.contains("\"id\":null"));
        let failed = next_text(&mut stream).await.unwrap();
        assert!(failed.contains("nope"));
        assert_eq!(next_text(&mut stream).await.unwrap(), "data: echo:still alive\n\n");
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_stream_drains_then_removes_after_grace() {
        let manager = manager(10_000);
        let (session, stream) = manager.open();
        let id = session.id().clone();

        drop(stream);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(session.state(), SessionState::Draining);
        assert!(manager.registry().get(id.as_str()).is_some());

        // Messages are still accepted while draining.
        session.deliver("late".into()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(9_000)).await;
        assert!(manager.registry().get(id.as_str()).is_some());

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(session.state(), SessionState::Closed);
        assert!(manager.registry().get(id.as_str()).is_none());
        assert!(session.outbound().is_closed());
        assert!(manager.inner.cleanups.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_disconnects_schedule_one_cleanup() {
        let manager = manager(5_000);
        let (session, _stream) = manager.open();
        let id = session.id().clone();

        manager.disconnect(&id);
        manager.disconnect(&id);
        assert_eq!(manager.inner.cleanups.len(), 1);
        assert_eq!(session.state(), SessionState::Draining);
    }

    #[tokio::test]
    async fn teardown_is_idempotent() {
        let manager = manager(60_000);
        let (session, _stream) = manager.open();
        let id = session.id().clone();

        manager.disconnect(&id);
        assert!(manager.teardown(&id));
        assert!(!manager.teardown(&id));
        assert!(manager.inner.cleanups.is_empty());

        assert_eq!(session.outbound().send("x").await, Err(ChannelError::Closed));
        assert_eq!(session.outbound().send("x").await, Err(ChannelError::Closed));
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn shutdown_ends_every_stream() {
        let manager = manager(60_000);
        let (_a, stream_a) = manager.open();
        let (_b, stream_b) = manager.open();
        let mut bodies = [into_body(stream_a), into_body(stream_b)];

        manager.shutdown();
        assert!(manager.registry().is_empty());

        for stream in &mut bodies {
            assert!(next_text(stream).await.unwrap().starts_with("event: endpoint"));
            assert_eq!(next_text(stream).await, None);
        }
    }
}
