//! Server-sent event sessions.
//!
//! Every push-style response is backed by a [`Session`]: a task writes
//! events into a bounded channel and the response body drains it through a
//! [`SessionStream`]. Client disconnect and service shutdown are collapsed
//! into the session's single [`CancellationToken`]:
//!
//! - the token is a child of the service shutdown token, and
//! - the [`SessionStream`] holds a drop guard that cancels the token when
//!   hyper drops the response body.
//!
//! ## Structure
//!
//! - [`processed`] - one-shot result stream (`/processed`).
//! - [`counter`] - liveness counter stream (`/counter`).

pub mod counter;
pub mod processed;

use axum::{
    http::{HeaderName, HeaderValue, header},
    response::sse::{Event, Sse},
};
use core::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use futures::Stream;
use pin_project_lite::pin_project;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

pub type SseItem = Result<Event, Infallible>;

/// Writer half of a stream session.
pub struct Session {
    pub token: CancellationToken,
    pub tx: mpsc::Sender<SseItem>,
}

impl Session {
    /// Opens a session whose token is a child of `parent`.
    ///
    /// `buffer` bounds how many frames may wait for the client before the
    /// writer is held back.
    pub fn open(parent: &CancellationToken, buffer: usize) -> (Self, SessionStream) {
        let token = parent.child_token();
        let (tx, rx) = mpsc::channel(buffer);

        let stream = SessionStream {
            inner: ReceiverStream::new(rx),
            _guard: token.clone().drop_guard(),
        };

        (Self { token, tx }, stream)
    }

    /// Writes one frame. Returns `false` if the client is gone.
    pub async fn push(&self, payload: String) -> bool {
        self.tx.send(Ok(Event::default().data(payload))).await.is_ok()
    }
}

pin_project! {
    /// Response body half of a stream session.
    ///
    /// Ends when the writer drops its [`Session`]. Dropping it cancels the
    /// session token.
    pub struct SessionStream {
        #[pin]
        inner: ReceiverStream<SseItem>,
        _guard: DropGuard,
    }
}

impl Stream for SessionStream {
    type Item = SseItem;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}

/// Wraps a session stream into an SSE response with the headers browsers
/// and proxies need to keep the stream unbuffered.
pub fn event_stream_response(
    stream: SessionStream,
) -> ([(HeaderName, HeaderValue); 3], Sse<SessionStream>) {
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/event-stream"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (header::CONNECTION, HeaderValue::from_static("keep-alive")),
        ],
        Sse::new(stream),
    )
}
