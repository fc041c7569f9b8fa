//! HTTP response building module
//!
//! Provides builders for the fixed responses the server emits, decoupled
//! from routing and rendering logic. All responses share one boxed body
//! type so fully-buffered and streamed pages can flow through the same
//! service signature.

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use std::convert::Infallible;

use super::cache::CachePolicy;

/// Body type shared by every response the server produces
pub type Body = BoxBody<Bytes, Infallible>;

/// Fixed body served while no renderer is installed yet
pub const WARMING_UP_BODY: &str = "Renderer warming up, please retry shortly";

/// Fixed body for render streams that fail with a not-found indication
pub const NOT_FOUND_BODY: &str = "404 | Page Not Found";

/// Fixed body for any other render failure
pub const INTERNAL_ERROR_BODY: &str = "500 | Internal Server Error";

/// Wrap a fully-buffered payload in the shared body type
pub fn full_body(data: impl Into<Bytes>) -> Body {
    Full::new(data.into()).boxed()
}

/// Build the warming-up placeholder response (renderer not ready)
///
/// Deliberately a 200: a cold dev server is a degraded state, not an error.
pub fn build_placeholder_response() -> Response<Body> {
    Response::builder()
        .status(200)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(full_body(WARMING_UP_BODY))
        .unwrap_or_else(|e| {
            log_build_error("placeholder", &e);
            Response::new(full_body(WARMING_UP_BODY))
        })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Body> {
    Response::builder()
        .status(404)
        .header("Content-Type", "text/plain")
        .body(full_body(NOT_FOUND_BODY))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(full_body(NOT_FOUND_BODY))
        })
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<Body> {
    Response::builder()
        .status(500)
        .header("Content-Type", "text/plain")
        .body(full_body(INTERNAL_ERROR_BODY))
        .unwrap_or_else(|e| {
            log_build_error("500", &e);
            Response::new(full_body(INTERNAL_ERROR_BODY))
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Body> {
    Response::builder()
        .status(405)
        .header("Content-Type", "text/plain")
        .header("Allow", "GET, HEAD, OPTIONS")
        .body(full_body("405 Method Not Allowed"))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(full_body("405 Method Not Allowed"))
        })
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response() -> Response<Body> {
    Response::builder()
        .status(204)
        .header("Allow", "GET, HEAD, OPTIONS")
        .body(full_body(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(full_body(Bytes::new()))
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str, policy: CachePolicy) -> Response<Body> {
    Response::builder()
        .status(304)
        .header("ETag", etag)
        .header("Cache-Control", policy.to_header_value())
        .body(full_body(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(full_body(Bytes::new()))
        })
}

/// Build static asset response with `ETag` and cache policy
pub fn build_static_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
    policy: CachePolicy,
    is_head: bool,
) -> Response<Body> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    Response::builder()
        .status(200)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("ETag", etag)
        .header("Cache-Control", policy.to_header_value())
        .body(full_body(body))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(full_body(Bytes::new()))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_success() {
        let resp = build_placeholder_response();
        assert_eq!(resp.status(), 200);
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(build_404_response().status(), 404);
        assert_eq!(build_500_response().status(), 500);
        assert_eq!(build_405_response().status(), 405);
        assert_eq!(build_options_response().status(), 204);
    }

    #[test]
    fn test_static_response_head_elides_body() {
        let resp = build_static_response(
            Bytes::from_static(b"asset"),
            "text/css",
            "\"e\"",
            CachePolicy::NoStore,
            true,
        );
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Content-Length"], "5");
        assert_eq!(resp.headers()["Cache-Control"], "no-store");
    }
}
