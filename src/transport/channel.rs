//! Outbound stream channel: the single writer of frames to one client.
//!
//! # Responsibilities
//! - Queue protocol messages for one long-lived streaming response
//! - Emit the handshake frame before anything else, exactly once
//! - Report writes after close or after the client went away
//!
//! The channel half (`OutboundChannel`) is held by the session; the stream
//! half (`EventStream`) becomes the HTTP response body. When the body is
//! dropped by the server (client disconnected), writes start failing with
//! `ChannelError::Disconnected`.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use axum::response::sse::Event;
use futures_util::Stream;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

use crate::session::SessionId;
use crate::transport::frame;

/// Errors returned by [`OutboundChannel::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// `close()` was called on this channel.
    #[error("outbound channel is closed")]
    Closed,
    /// The client dropped the streaming response.
    #[error("client disconnected from the event stream")]
    Disconnected,
}

struct Shared {
    session_id: SessionId,
    sender: Mutex<Option<mpsc::Sender<Event>>>,
    closed: watch::Sender<bool>,
}

/// Writer half of a session's event stream. Cheap to clone.
#[derive(Clone)]
pub struct OutboundChannel {
    shared: Arc<Shared>,
}

impl OutboundChannel {
    /// Open a channel for `session_id`.
    ///
    /// The returned stream yields the handshake frame on its first poll,
    /// without touching the queue, so the client learns its identifier
    /// before any message can be written.
    pub fn open(session_id: SessionId, capacity: usize) -> (Self, EventStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (closed, _) = watch::channel(false);

        let stream = EventStream {
            handshake: Some(frame::endpoint_event(&session_id)),
            events: rx,
            drop_signal: None,
        };

        let channel = Self {
            shared: Arc::new(Shared {
                session_id,
                sender: Mutex::new(Some(tx)),
                closed,
            }),
        };

        (channel, stream)
    }

    /// Queue one serialized protocol message.
    ///
    /// Messages are delivered in the order `send` calls complete. Waits when
    /// the buffer is full.
    pub async fn send(&self, payload: impl AsRef<str>) -> Result<(), ChannelError> {
        let sender = {
            let guard = self
                .shared
                .sender
                .lock()
                .expect("outbound channel mutex poisoned");
            guard.clone().ok_or(ChannelError::Closed)?
        };

        sender
            .send(frame::message_event(payload.as_ref()))
            .await
            .map_err(|_| ChannelError::Disconnected)
    }

    /// Stop accepting messages and end the stream once queued frames drain.
    ///
    /// Idempotent.
    pub fn close(&self) {
        let taken = self
            .shared
            .sender
            .lock()
            .expect("outbound channel mutex poisoned")
            .take();

        if taken.is_some() {
            self.shared.closed.send_replace(true);
            tracing::debug!(session_id = %self.shared.session_id, "Outbound channel closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.shared.closed.borrow()
    }

    /// Resolves once `close()` has been called.
    pub async fn closed(&self) {
        let mut rx = self.shared.closed.subscribe();
        // The sender lives in `self`, so this only errors if it was dropped.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl std::fmt::Debug for OutboundChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundChannel")
            .field("session_id", &self.shared.session_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Reader half, wrapped in an `Sse` response by the HTTP layer.
pub struct EventStream {
    handshake: Option<Event>,
    events: mpsc::Receiver<Event>,
    drop_signal: Option<oneshot::Sender<()>>,
}

impl EventStream {
    /// Returns a receiver that completes when this stream is dropped.
    ///
    /// The server drops the response body when the client goes away, which
    /// makes this the transport-level disconnect signal.
    pub fn notify_on_drop(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.drop_signal = Some(tx);
        rx
    }
}

impl Stream for EventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(handshake) = self.handshake.take() {
            return Poll::Ready(Some(Ok(handshake)));
        }

        self.events.poll_recv(cx).map(|event| event.map(Ok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::response::sse::Sse;
    use axum::response::IntoResponse;
    use http_body_util::BodyExt;

    fn open() -> (OutboundChannel, Body) {
        let (channel, stream) = OutboundChannel::open(SessionId::from("s1"), 8);
        (channel, Sse::new(stream).into_response().into_body())
    }

    /// Next rendered frame, or `None` once the stream has ended.
    async fn next_text(body: &mut Body) -> Option<String> {
        let frame = body.frame().await?.unwrap();
        let bytes = frame.into_data().unwrap();
        Some(String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn handshake_comes_first_even_with_queued_messages() {
        let (channel, mut body) = open();
        channel.send("one").await.unwrap();
        channel.send("two").await.unwrap();

        assert_eq!(
            next_text(&mut body).await.unwrap(),
            "event: endpoint\ndata: /message?sessionId=s1\n\n"
        );
        assert_eq!(next_text(&mut body).await.unwrap(), "data: one\n\n");
        assert_eq!(next_text(&mut body).await.unwrap(), "data: two\n\n");
    }

    #[tokio::test]
    async fn send_after_close_always_fails_the_same_way() {
        let (channel, mut body) = open();
        channel.close();
        channel.close();

        for _ in 0..3 {
            assert_eq!(channel.send("late").await, Err(ChannelError::Closed));
        }

        // Exactly one handshake, then the stream ends.
        assert!(next_text(&mut body).await.unwrap().starts_with("event: endpoint"));
        assert_eq!(next_text(&mut body).await, None);
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn queued_frames_drain_before_stream_ends() {
        let (channel, mut body) = open();
        channel.send("last words").await.unwrap();
        channel.close();

        next_text(&mut body).await.unwrap();
        assert_eq!(next_text(&mut body).await.unwrap(), "data: last words\n\n");
        assert_eq!(next_text(&mut body).await, None);
    }

    #[tokio::test]
    async fn dropped_stream_reports_disconnect() {
        let (channel, mut stream) = OutboundChannel::open(SessionId::from("s1"), 8);
        let dropped = stream.notify_on_drop();
        drop(stream);

        assert!(dropped.await.is_err());
        assert_eq!(channel.send("anyone?").await, Err(ChannelError::Disconnected));

        // Closing afterwards switches to the closed error.
        channel.close();
        assert_eq!(channel.send("anyone?").await, Err(ChannelError::Closed));
    }

    #[tokio::test]
    async fn dropping_the_response_body_fires_the_drop_signal() {
        let (_channel, mut stream) = OutboundChannel::open(SessionId::from("s1"), 8);
        let dropped = stream.notify_on_drop();
        let body = Sse::new(stream).into_response().into_body();

        drop(body);
        assert!(dropped.await.is_err());
    }

    #[tokio::test]
    async fn closed_future_resolves_on_close() {
        let (channel, _body) = open();
        let waiter = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.closed().await })
        };
        channel.close();
        waiter.await.unwrap();
    }
}
