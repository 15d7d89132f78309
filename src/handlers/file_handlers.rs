//! HTTP handlers for the `/files` routes.
//! Each handler pulls its inputs out of the request, makes one gateway call,
//! and shapes the result; all storage logic lives in `StorageGateway`.

use crate::{
    errors::AppError,
    models::upload::UploadRequest,
    services::storage_gateway::{GatewayError, StorageGateway},
};
use axum::{
    Json,
    body::Body,
    extract::{
        Multipart, Query, State,
        multipart::{Field, MultipartRejection},
        rejection::QueryRejection,
    },
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use futures::TryStreamExt;
use serde::Deserialize;
use std::io;

const SINGLE_UPLOAD_FIELD: &str = "file";
const BATCH_UPLOAD_FIELD: &str = "photos";

/// Query for routes addressing one object.
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: String,
}

/// Query for `GET /files/list`; a missing or empty folder lists the whole bucket.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub folder: Option<String>,
}

/// `POST /files/upload`: store the `file` part and return its public URL.
pub async fn upload_file(
    State(gateway): State<StorageGateway>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<String, AppError> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(SINGLE_UPLOAD_FIELD) {
            let upload = read_upload(field).await?;
            return Ok(gateway.save(upload).await?);
        }
    }

    Err(AppError::bad_request(format!(
        "missing multipart field `{}`",
        SINGLE_UPLOAD_FIELD
    )))
}

/// `POST /files/batch-upload`: store every `photos` part, in the order sent.
pub async fn batch_upload(
    State(gateway): State<StorageGateway>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<String>>, AppError> {
    let mut multipart = multipart?;

    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(BATCH_UPLOAD_FIELD) {
            uploads.push(read_upload(field).await?);
        }
    }

    if uploads.is_empty() {
        return Err(AppError::bad_request(format!(
            "missing multipart field `{}`",
            BATCH_UPLOAD_FIELD
        )));
    }

    Ok(Json(gateway.save_many(uploads).await?))
}

/// `DELETE /files/delete?url=`
pub async fn delete_file(
    State(gateway): State<StorageGateway>,
    query: Result<Query<UrlQuery>, QueryRejection>,
) -> Result<&'static str, AppError> {
    let Query(q) = query?;
    gateway.delete(&q.url).await?;
    Ok("File deleted successfully.")
}

/// `DELETE /files/batch-delete?urls=..&urls=..`
pub async fn batch_delete(
    State(gateway): State<StorageGateway>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<&'static str, AppError> {
    let Query(pairs) = query?;
    let urls: Vec<String> = pairs
        .into_iter()
        .filter(|(name, _)| name == "urls")
        .map(|(_, value)| value)
        .collect();

    if urls.is_empty() {
        return Err(AppError::bad_request("missing query parameter `urls`"));
    }

    gateway.delete_many(&urls).await?;
    Ok("Files deleted successfully.")
}

/// `GET /files/download?url=`: raw object bytes.
pub async fn download_file(
    State(gateway): State<StorageGateway>,
    query: Result<Query<UrlQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(q) = query?;
    let bytes = gateway.load(&q.url).await?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    Ok(response)
}

/// `GET /files/list?folder=`
pub async fn list_files(
    State(gateway): State<StorageGateway>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<String>>, AppError> {
    let Query(q) = query?;
    let urls = gateway.list(q.folder.as_deref()).await?;
    Ok(Json(urls))
}

/// Buffer one multipart part into an `UploadRequest`.
async fn read_upload(field: Field<'_>) -> Result<UploadRequest, GatewayError> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let stream = field.map_err(io::Error::other);

    UploadRequest::from_stream(filename.clone(), content_type, stream)
        .await
        .map_err(|err| GatewayError::unreadable(filename, err))
}
