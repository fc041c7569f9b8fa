//! Server-side rendering pipeline module
//!
//! Turns a render stream into an HTML response wrapped in the template
//! halves. The stream is drained up to a size threshold before the status
//! line is committed, so early failures (including not-found signaled after
//! a few chunks) still map to their proper status codes; only renders
//! larger than the threshold switch to progressive streaming, where a late
//! failure can no longer change the status and truncates the body instead.

use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::Response;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::router::RequestContext;
use crate::config::AppState;
use crate::http::response::full_body;
use crate::http::{self, Body};
use crate::logger;
use crate::render::{
    state_script, RenderContext, RenderError, RenderEvent, RenderStream, SsrRuntime,
};

/// Advertised versions of the HTTP stack and this server.
///
/// The hyper version mirrors the dependency declaration in Cargo.toml and
/// must be updated together with it.
pub const SERVER_INFO: &str = concat!("hyper/1.5 renderd/", env!("CARGO_PKG_VERSION"));

/// Render output buffered before the status line is committed
const STREAM_COMMIT_THRESHOLD: usize = 64 * 1024;

/// Render a page for the request URL
pub async fn respond(ctx: &RequestContext<'_>, state: &Arc<AppState>) -> Response<Body> {
    let Some(runtime) = state.runtime().await else {
        return http::build_placeholder_response();
    };

    let started = Instant::now();
    let mut stream = runtime
        .renderer
        .render(RenderContext::new(ctx.url.clone()))
        .await;

    let mut chunks: Vec<Bytes> = Vec::new();
    let mut buffered = 0usize;

    loop {
        match stream.next().await {
            Some(Ok(RenderEvent::Chunk(chunk))) => {
                buffered += chunk.len();
                chunks.push(chunk);
                if buffered >= STREAM_COMMIT_THRESHOLD {
                    // Too large to hold back; commit 200 and forward the rest
                    return stream_page(runtime, stream, chunks, ctx, started);
                }
            }
            Some(Ok(RenderEvent::Completed { initial_state })) => {
                logger::log_render_complete(&ctx.url, started.elapsed());
                let page = assemble_page(&runtime, &chunks, initial_state.as_ref());
                let page_len = page.len();
                let body = if ctx.is_head {
                    full_body(Bytes::new())
                } else {
                    full_body(page)
                };
                return page_response(body, Some(page_len));
            }
            Some(Err(RenderError::NotFound)) => {
                return http::build_404_response();
            }
            Some(Err(err)) => {
                logger::log_render_failure(&ctx.url, &err);
                return http::build_500_response();
            }
            None => {
                logger::log_render_failure(
                    &ctx.url,
                    &RenderError::Failed("render stream ended without completing".into()),
                );
                return http::build_500_response();
            }
        }
    }
}

/// Concatenate head, rendered chunks, optional state script, and tail.
///
/// Assembled as bytes: chunk boundaries may fall inside multi-byte
/// sequences, so the rendered output is never reinterpreted as text here.
fn assemble_page(
    runtime: &SsrRuntime,
    chunks: &[Bytes],
    initial_state: Option<&serde_json::Value>,
) -> Bytes {
    let rendered: usize = chunks.iter().map(Bytes::len).sum();
    let mut page = Vec::with_capacity(
        runtime.template.head.len() + rendered + runtime.template.tail.len(),
    );

    page.extend_from_slice(runtime.template.head.as_bytes());
    for chunk in chunks {
        page.extend_from_slice(chunk);
    }
    if let Some(state) = initial_state {
        page.extend_from_slice(state_script(state).as_bytes());
    }
    page.extend_from_slice(runtime.template.tail.as_bytes());
    Bytes::from(page)
}

/// Stream a page whose render output exceeded the commit threshold.
///
/// The 200 status is committed here; a later render failure is logged and
/// truncates the body, since the status line is already on the wire.
fn stream_page(
    runtime: Arc<SsrRuntime>,
    mut stream: RenderStream,
    buffered: Vec<Bytes>,
    ctx: &RequestContext<'_>,
    started: Instant,
) -> Response<Body> {
    if ctx.is_head {
        return page_response(full_body(Bytes::new()), None);
    }

    let url = ctx.url.clone();
    let (tx, rx) = mpsc::channel::<Result<Frame<Bytes>, Infallible>>(16);

    tokio::spawn(async move {
        let head = Bytes::from(runtime.template.head.clone());
        if tx.send(Ok(Frame::data(head))).await.is_err() {
            return;
        }
        for chunk in buffered {
            if tx.send(Ok(Frame::data(chunk))).await.is_err() {
                return;
            }
        }

        loop {
            match stream.next().await {
                Some(Ok(RenderEvent::Chunk(chunk))) => {
                    if tx.send(Ok(Frame::data(chunk))).await.is_err() {
                        return;
                    }
                }
                Some(Ok(RenderEvent::Completed { initial_state })) => {
                    let mut closing = String::new();
                    if let Some(state) = &initial_state {
                        closing.push_str(&state_script(state));
                    }
                    closing.push_str(&runtime.template.tail);
                    let _ = tx.send(Ok(Frame::data(Bytes::from(closing)))).await;
                    logger::log_render_complete(&url, started.elapsed());
                    return;
                }
                Some(Err(err)) => {
                    logger::log_render_failure(&url, &err);
                    return;
                }
                None => {
                    logger::log_render_failure(
                        &url,
                        &RenderError::Failed("render stream ended without completing".into()),
                    );
                    return;
                }
            }
        }
    });

    page_response(StreamBody::new(ReceiverStream::new(rx)).boxed(), None)
}

/// Build the rendered page response envelope.
///
/// Buffered pages carry an explicit Content-Length so the access log can
/// record the body size; streamed pages have no known length up front.
fn page_response(body: Body, content_length: Option<usize>) -> Response<Body> {
    let mut builder = Response::builder()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Server", SERVER_INFO);
    if let Some(len) = content_length {
        builder = builder.header("Content-Length", len);
    }

    builder.body(body).unwrap_or_else(|e| {
        logger::log_error(&format!("Failed to build page response: {e}"));
        Response::new(full_body(Bytes::new()))
    })
}
