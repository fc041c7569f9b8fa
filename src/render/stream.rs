//! Render stream abstraction module
//!
//! Defines the capability interface between request handling and the
//! rendering engine: given a request context, an engine produces a finite,
//! failable, ordered sequence of output fragments plus an optional terminal
//! initial-state value. The stream is pull-based with explicit terminal
//! events, so the engine can be swapped or mocked without touching the
//! request handler.

use async_trait::async_trait;
use hyper::body::Bytes;
use std::fmt;
use tokio::sync::mpsc;

/// Per-request rendering input
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Request URL (path and query) the page is rendered for
    pub url: String,
}

impl RenderContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// One event observed on a render stream
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    /// An output fragment, forwarded verbatim in emission order
    Chunk(Bytes),
    /// Successful completion, with the accumulated initial state if any
    Completed {
        initial_state: Option<serde_json::Value>,
    },
}

/// Render failure raised by an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The rendered route does not exist
    NotFound,
    /// Any other engine failure, with detail for the error log
    Failed(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "route not found"),
            Self::Failed(detail) => write!(f, "render failed: {detail}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Consumer half of a render stream.
///
/// `next()` yields events in emission order. The stream is finite and not
/// restartable: after a `Completed` event or an error it only yields `None`.
/// A `None` before any terminal event means the producer vanished and the
/// output is truncated.
pub struct RenderStream {
    rx: mpsc::Receiver<Result<RenderEvent, RenderError>>,
    finished: bool,
}

impl RenderStream {
    /// Create a connected producer/consumer pair
    pub fn channel(buffer: usize) -> (RenderSink, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            RenderSink { tx },
            Self {
                rx,
                finished: false,
            },
        )
    }

    /// Wait for the next event
    pub async fn next(&mut self) -> Option<Result<RenderEvent, RenderError>> {
        if self.finished {
            return None;
        }

        let event = self.rx.recv().await;
        match &event {
            Some(Ok(RenderEvent::Completed { .. }) | Err(_)) | None => self.finished = true,
            Some(Ok(RenderEvent::Chunk(_))) => {}
        }
        event
    }
}

/// Producer half used by engine implementations
#[derive(Clone)]
pub struct RenderSink {
    tx: mpsc::Sender<Result<RenderEvent, RenderError>>,
}

impl RenderSink {
    /// Send an output fragment. Returns false if the consumer is gone.
    pub async fn chunk(&self, data: impl Into<Bytes>) -> bool {
        self.tx
            .send(Ok(RenderEvent::Chunk(data.into())))
            .await
            .is_ok()
    }

    /// Signal successful completion with the optional initial state
    pub async fn complete(&self, initial_state: Option<serde_json::Value>) {
        let _ = self
            .tx
            .send(Ok(RenderEvent::Completed { initial_state }))
            .await;
    }

    /// Signal failure
    pub async fn fail(&self, err: RenderError) {
        let _ = self.tx.send(Err(err)).await;
    }
}

/// Rendering engine capability.
///
/// An implementation owns whatever it needs to produce output for one
/// request URL; the handler only ever sees the stream.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Start rendering for the given context
    async fn render(&self, ctx: RenderContext) -> RenderStream;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_emission_order() {
        let (sink, mut stream) = RenderStream::channel(8);
        sink.chunk("a").await;
        sink.chunk("b").await;
        sink.complete(None).await;

        assert_eq!(
            stream.next().await,
            Some(Ok(RenderEvent::Chunk(Bytes::from_static(b"a"))))
        );
        assert_eq!(
            stream.next().await,
            Some(Ok(RenderEvent::Chunk(Bytes::from_static(b"b"))))
        );
        assert_eq!(
            stream.next().await,
            Some(Ok(RenderEvent::Completed {
                initial_state: None
            }))
        );
    }

    #[tokio::test]
    async fn test_stream_is_finished_after_completion() {
        let (sink, mut stream) = RenderStream::channel(8);
        sink.complete(None).await;
        // Late sends must not be observable after the terminal event
        sink.chunk("late").await;

        assert!(matches!(
            stream.next().await,
            Some(Ok(RenderEvent::Completed { .. }))
        ));
        assert_eq!(stream.next().await, None);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_stream_is_finished_after_failure() {
        let (sink, mut stream) = RenderStream::channel(8);
        sink.chunk("partial").await;
        sink.fail(RenderError::NotFound).await;

        assert!(matches!(stream.next().await, Some(Ok(RenderEvent::Chunk(_)))));
        assert_eq!(stream.next().await, Some(Err(RenderError::NotFound)));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_dropped_producer_truncates() {
        let (sink, mut stream) = RenderStream::channel(8);
        sink.chunk("only").await;
        drop(sink);

        assert!(matches!(stream.next().await, Some(Ok(RenderEvent::Chunk(_)))));
        assert_eq!(stream.next().await, None);
    }
}
