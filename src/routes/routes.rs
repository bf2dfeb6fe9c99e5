//! Route table for the attachment gateway.
//!
//! ## Structure
//! - `POST   /upload`      — multipart upload (`file` required, `key` optional)
//! - `GET    /file/{*key}` — download payload as attachment
//! - `DELETE /file/{*key}` — idempotent delete
//! - `GET    /list`        — full listing
//! - `OPTIONS *`           — CORS preflight, empty 200
//! - anything else         — JSON 404 (unmatched methods included, no 405s)
//!
//! The wildcard `{*key}` is percent-decoded exactly once by the router, so
//! keys round-trip through the encoded URLs the upload handler returns, even
//! when they contain slashes.

use crate::{
    handlers::gateway_handlers::{
        delete_file, download_file, list_files, preflight, route_fallback, upload_file,
    },
    services::bucket::SharedBucket,
};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};

/// Build the gateway router.
///
/// The router carries the shared bucket handle to all handlers. The CORS
/// layer runs after every handler (and after the fallback), so the headers
/// are merged in last and can never be overwritten by a metadata copy.
/// Body size limits are disabled; any cap is the bucket's concern.
pub fn routes() -> Router<SharedBucket> {
    Router::new()
        .route(
            "/upload",
            post(upload_file).options(preflight).fallback(route_fallback),
        )
        .route(
            "/file/{*key}",
            get(download_file)
                .delete(delete_file)
                .options(preflight)
                .fallback(route_fallback),
        )
        .route(
            "/list",
            get(list_files).options(preflight).fallback(route_fallback),
        )
        .fallback(route_fallback)
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn(apply_cors))
}

/// Attach the fixed CORS header set to every response, errors included.
async fn apply_cors(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    response
}
