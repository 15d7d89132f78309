//! Defines routes for the file gateway.
//!
//! ## Structure
//! - **File endpoints** (all under `/files`)
//!   - `POST   /files/upload`        multipart `file`, returns the public URL
//!   - `POST   /files/batch-upload`  multipart `photos` (repeated), returns URLs
//!   - `DELETE /files/delete`        `?url=`
//!   - `DELETE /files/batch-delete`  `?urls=..&urls=..`
//!   - `GET    /files/download`      `?url=`, raw bytes
//!   - `GET    /files/list`          `?folder=`, returns URLs
//!
//! - **Probes**: `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        file_handlers::{
            batch_delete, batch_upload, delete_file, download_file, list_files, upload_file,
        },
        health_handlers::{healthz, readyz},
    },
    services::storage_gateway::StorageGateway,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

/// Build and return the router for all gateway routes.
///
/// The router carries shared state (`StorageGateway`) to all handlers.
/// Request bodies above `max_upload_bytes` are rejected with 413.
pub fn routes(max_upload_bytes: usize) -> Router<StorageGateway> {
    let files = Router::new()
        .route("/upload", post(upload_file))
        .route("/batch-upload", post(batch_upload))
        .route("/delete", delete(delete_file))
        .route("/batch-delete", delete(batch_delete))
        .route("/download", get(download_file))
        .route("/list", get(list_files));

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .nest("/files", files)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}
