//! Bundle engine module
//!
//! Concrete `Renderer` backed by a compiled server bundle executed in an
//! external runner process (typically `node`). One process is spawned per
//! render; its stdout is forwarded chunk-by-chunk as it arrives.
//!
//! Subprocess protocol:
//! - stdin: one JSON request line, `{"url": "..."}`.
//! - stdout: the rendered markup, streamed verbatim.
//! - stderr on exit 0: optional initial-state JSON value.
//! - stderr on non-zero exit: JSON error object `{"code", "message"}`;
//!   code `"404"` indicates the rendered route does not exist.

use async_trait::async_trait;
use hyper::body::Bytes;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use super::stream::{RenderContext, RenderError, RenderSink, RenderStream, Renderer};
use crate::logger;

const CHUNK_SIZE: usize = 8192;

/// Renderer bound to one compiled bundle on disk
pub struct BundleRenderer {
    /// Runner executable, e.g. `node`
    runner: PathBuf,
    /// Compiled server bundle the runner executes
    bundle: PathBuf,
}

/// Error object the bundle writes to stderr on failure
#[derive(Debug, Deserialize)]
struct BundleFailure {
    code: Option<String>,
    message: Option<String>,
}

impl BundleRenderer {
    pub fn new(runner: impl Into<PathBuf>, bundle: impl Into<PathBuf>) -> Self {
        Self {
            runner: runner.into(),
            bundle: bundle.into(),
        }
    }
}

#[async_trait]
impl Renderer for BundleRenderer {
    async fn render(&self, ctx: RenderContext) -> RenderStream {
        let (sink, stream) = RenderStream::channel(16);
        let runner = self.runner.clone();
        let bundle = self.bundle.clone();

        tokio::spawn(async move {
            run_bundle(&runner, &bundle, &ctx, &sink).await;
        });

        stream
    }
}

/// Drive one bundle process and feed its output into the sink
async fn run_bundle(runner: &Path, bundle: &Path, ctx: &RenderContext, sink: &RenderSink) {
    let mut child = match Command::new(runner)
        .arg(bundle)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            sink.fail(RenderError::Failed(format!(
                "failed to spawn render bundle: {e}"
            )))
            .await;
            return;
        }
    };

    // Write the request line; dropping stdin afterward signals EOF
    if let Some(mut stdin) = child.stdin.take() {
        let request = serde_json::json!({ "url": ctx.url });
        let mut line = request.to_string();
        line.push('\n');

        if let Err(e) = stdin.write_all(line.as_bytes()).await {
            sink.fail(RenderError::Failed(format!(
                "failed to send render request: {e}"
            )))
            .await;
            return;
        }
    }

    let Some(mut stdout) = child.stdout.take() else {
        sink.fail(RenderError::Failed("bundle stdout not captured".into()))
            .await;
        return;
    };

    // Collect stderr concurrently so a chatty bundle cannot deadlock on a
    // full pipe while we are still reading stdout
    let stderr_task = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        })
    });

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match stdout.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if !sink.chunk(Bytes::copy_from_slice(&buf[..n])).await {
                    // Consumer gone; kill_on_drop reaps the child
                    return;
                }
            }
            Err(e) => {
                sink.fail(RenderError::Failed(format!(
                    "failed to read bundle output: {e}"
                )))
                .await;
                return;
            }
        }
    }

    let stderr_bytes = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => Vec::new(),
    };

    match child.wait().await {
        Ok(status) if status.success() => {
            sink.complete(parse_initial_state(&stderr_bytes)).await;
        }
        Ok(status) => {
            sink.fail(classify_failure(&stderr_bytes, status.code())).await;
        }
        Err(e) => {
            sink.fail(RenderError::Failed(format!(
                "failed to wait for render bundle: {e}"
            )))
            .await;
        }
    }
}

/// Parse the optional initial-state value a successful bundle left on stderr
fn parse_initial_state(stderr: &[u8]) -> Option<serde_json::Value> {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str(trimmed) {
        Ok(value) => Some(value),
        Err(e) => {
            logger::log_warning(&format!("Discarding malformed initial state: {e}"));
            None
        }
    }
}

/// Map a failed bundle exit to a render error
fn classify_failure(stderr: &[u8], exit_code: Option<i32>) -> RenderError {
    if let Ok(failure) = serde_json::from_slice::<BundleFailure>(stderr) {
        if failure.code.as_deref() == Some("404") {
            return RenderError::NotFound;
        }
        if let Some(message) = failure.message {
            return RenderError::Failed(message);
        }
    }

    let detail = String::from_utf8_lossy(stderr);
    let detail = detail.trim();
    if detail.is_empty() {
        RenderError::Failed(format!(
            "render bundle exited with status {}",
            exit_code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
        ))
    } else {
        RenderError::Failed(detail.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_not_found() {
        let err = classify_failure(br#"{"code":"404","message":"no route"}"#, Some(1));
        assert_eq!(err, RenderError::NotFound);
    }

    #[test]
    fn test_classify_failure_with_message() {
        let err = classify_failure(br#"{"code":"500","message":"boom"}"#, Some(1));
        assert_eq!(err, RenderError::Failed("boom".to_string()));
    }

    #[test]
    fn test_classify_unstructured_stderr() {
        let err = classify_failure(b"TypeError: x is not a function\n", Some(1));
        assert_eq!(
            err,
            RenderError::Failed("TypeError: x is not a function".to_string())
        );
    }

    #[test]
    fn test_classify_silent_failure() {
        let err = classify_failure(b"", Some(3));
        assert_eq!(
            err,
            RenderError::Failed("render bundle exited with status 3".to_string())
        );
    }

    #[test]
    fn test_parse_initial_state() {
        assert_eq!(
            parse_initial_state(b"{\"x\":1}\n"),
            Some(serde_json::json!({"x": 1}))
        );
        assert_eq!(parse_initial_state(b""), None);
        assert_eq!(parse_initial_state(b"  \n"), None);
        assert_eq!(parse_initial_state(b"not json"), None);
    }
}
