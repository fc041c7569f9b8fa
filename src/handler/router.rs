//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, the fixed
//! asset route table, and dispatch into the rendering pipeline.

use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::{ssr, static_files};
use crate::config::AppState;
use crate::http::{self, Body, CachePolicy};
use crate::logger::{self, AccessLogEntry};

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    /// Path and query, handed to the renderer as rendering context
    pub url: String,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub access_log: bool,
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Body>, Infallible> {
    let started = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let path = uri.path();
    let is_head = method == Method::HEAD;

    if let Some(resp) = check_http_method(&method) {
        return Ok(resp);
    }

    let ctx = RequestContext {
        path,
        url: uri
            .path_and_query()
            .map_or_else(|| path.to_string(), ToString::to_string),
        is_head,
        if_none_match: header_value(&req, "if-none-match"),
        access_log: state.access_log_enabled(),
    };

    let response = route_request(&ctx, &state).await;

    if ctx.access_log {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            method.to_string(),
            path.to_string(),
        );
        entry.query = uri.query().map(ToString::to_string);
        entry.http_version = version_label(req.version()).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = content_length(&response);
        entry.referer = header_value(&req, "referer");
        entry.user_agent = header_value(&req, "user-agent");
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method) -> Option<Response<Body>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Route request based on the fixed asset table, falling back to rendering
async fn route_request(ctx: &RequestContext<'_>, state: &Arc<AppState>) -> Response<Body> {
    let assets = &state.config.assets;
    let policy = CachePolicy::for_mode(state.config.mode, assets.cache_max_age);

    // 1. Favicon (not content-hashed, so cacheable but never immutable)
    if ctx.path == "/favicon.ico" {
        let favicon_policy = match policy {
            CachePolicy::Immutable(max_age) => CachePolicy::Public(max_age),
            other => other,
        };
        return static_files::serve_file(ctx, &assets.favicon, favicon_policy).await;
    }

    // 2. Exact asset routes
    if ctx.path == "/service-worker.js" {
        return static_files::serve_file(ctx, &assets.service_worker, policy).await;
    }
    if ctx.path == "/manifest.json" {
        return static_files::serve_file(ctx, &assets.manifest, policy).await;
    }

    // 3. Asset directories
    if ctx.path.starts_with("/dist/") {
        return static_files::serve_directory(ctx, &assets.dist_dir, "/dist", policy).await;
    }
    if ctx.path.starts_with("/public/") {
        return static_files::serve_directory(ctx, &assets.public_dir, "/public", policy).await;
    }

    // 4. Everything else goes through the render pipeline
    ssr::respond(ctx, state).await
}

fn header_value(req: &Request<hyper::body::Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn content_length(response: &Response<Body>) -> usize {
    response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn version_label(version: hyper::Version) -> &'static str {
    if version == hyper::Version::HTTP_10 {
        "1.0"
    } else if version == hyper::Version::HTTP_2 {
        "2"
    } else {
        "1.1"
    }
}
