//! Defines routes for the upload page and probes.
//!
//! ## Structure
//! - `GET  /`        - upload form and current listing
//! - `POST /`        - multipart upload, answered with the same page
//! - `GET  /healthz` - liveness
//! - `GET  /readyz`  - storage readiness

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        page_handlers::{index, upload},
    },
    state::AppState,
};
use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build and return the router for the application.
///
/// The body limit sits just above `max_upload_bytes` so that slightly
/// oversized files are still read far enough to be reported on the page.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/", get(index).post(upload))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
        .layer(TraceLayer::new_for_http())
}
