//! Static file serving module
//!
//! Serves the fixed asset routes: file loading, MIME detection, and
//! conditional responses with the per-mode cache policy.

use hyper::body::Bytes;
use hyper::Response;
use std::path::Path;
use tokio::fs;

use super::router::RequestContext;
use crate::http::{self, cache, mime, Body, CachePolicy};
use crate::logger;

/// Serve a single configured file
pub async fn serve_file(
    ctx: &RequestContext<'_>,
    file_path: &Path,
    policy: CachePolicy,
) -> Response<Body> {
    match load_single_file(file_path).await {
        Some((content, content_type)) => {
            build_asset_response(&content, content_type, ctx, policy)
        }
        None => http::build_404_response(),
    }
}

/// Serve static files from a directory route
pub async fn serve_directory(
    ctx: &RequestContext<'_>,
    dir: &Path,
    route_prefix: &str,
    policy: CachePolicy,
) -> Response<Body> {
    match load_from_directory(dir, ctx.path, route_prefix).await {
        Some((content, content_type)) => {
            build_asset_response(&content, content_type, ctx, policy)
        }
        None => http::build_404_response(),
    }
}

/// Load a file from a directory route with traversal protection
async fn load_from_directory(
    static_dir: &Path,
    path: &str,
    route_prefix: &str,
) -> Option<(Vec<u8>, &'static str)> {
    // Remove leading slash and prevent directory traversal
    let clean_path = path.trim_start_matches('/').replace("..", "");

    // Remove route prefix from path
    let prefix_clean = route_prefix.trim_matches('/');
    let relative_path = if prefix_clean.is_empty() {
        clean_path.as_str()
    } else {
        clean_path
            .strip_prefix(&format!("{prefix_clean}/"))
            .unwrap_or(&clean_path)
    };

    let file_path = static_dir.join(relative_path);

    // Security: ensure file_path stays within static_dir
    let static_dir_canonical = match static_dir.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Asset directory not found or inaccessible '{}': {e}",
                static_dir.display()
            ));
            return None;
        }
    };

    // File not found is common (404), no need to log at warning level
    let Ok(file_path_canonical) = file_path.canonicalize() else {
        return None;
    };
    if !file_path_canonical.starts_with(&static_dir_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            path,
            file_path_canonical.display()
        ));
        return None;
    }

    let content = match fs::read(&file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read asset '{}': {e}",
                file_path.display()
            ));
            return None;
        }
    };

    let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));
    Some((content, content_type))
}

/// Load a single file
async fn load_single_file(path: &Path) -> Option<(Vec<u8>, &'static str)> {
    let content = fs::read(path).await.ok()?;
    let content_type = mime::get_content_type(path.extension().and_then(|e| e.to_str()));
    Some((content, content_type))
}

/// Build asset response with `ETag`, conditional handling, and cache policy
fn build_asset_response(
    data: &[u8],
    content_type: &str,
    ctx: &RequestContext<'_>,
    policy: CachePolicy,
) -> Response<Body> {
    let etag = cache::generate_etag(data);

    if cache::check_etag_match(ctx.if_none_match.as_deref(), &etag) {
        return http::build_304_response(&etag, policy);
    }

    http::build_static_response(
        Bytes::from(data.to_owned()),
        content_type,
        &etag,
        policy,
        ctx.is_head,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(path: &'static str) -> RequestContext<'static> {
        RequestContext {
            path,
            url: path.to_string(),
            is_head: false,
            if_none_match: None,
            access_log: false,
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let resp = serve_file(
            &ctx("/favicon.ico"),
            Path::new("definitely/missing/logo.png"),
            CachePolicy::NoStore,
        )
        .await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_serves_file_with_policy_and_etag() {
        let dir = std::env::temp_dir().join("renderd-test-serve-file");
        fs::create_dir_all(&dir).await.unwrap();
        let file = dir.join("app.js");
        fs::write(&file, b"console.log(1)").await.unwrap();

        let resp = serve_file(&ctx("/dist/app.js"), &file, CachePolicy::Immutable(60)).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Content-Type"], "application/javascript");
        assert_eq!(
            resp.headers()["Cache-Control"],
            "public, max-age=60, immutable"
        );
        assert!(resp.headers().contains_key("ETag"));
    }

    #[tokio::test]
    async fn test_conditional_request_yields_304() {
        let dir = std::env::temp_dir().join("renderd-test-304");
        fs::create_dir_all(&dir).await.unwrap();
        let file = dir.join("style.css");
        fs::write(&file, b"body{}").await.unwrap();

        let etag = cache::generate_etag(b"body{}");
        let mut c = ctx("/dist/style.css");
        c.if_none_match = Some(etag);

        let resp = serve_file(&c, &file, CachePolicy::NoStore).await;
        assert_eq!(resp.status(), 304);
    }

    #[tokio::test]
    async fn test_directory_traversal_blocked() {
        let dir = std::env::temp_dir().join("renderd-test-traversal");
        fs::create_dir_all(&dir).await.unwrap();

        let resp = serve_directory(
            &ctx("/dist/../../etc/passwd"),
            &dir,
            "/dist",
            CachePolicy::NoStore,
        )
        .await;
        assert_eq!(resp.status(), 404);
    }
}
