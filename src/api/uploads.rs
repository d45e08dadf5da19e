use axum::{
    body::Body,
    extract::{Extension, Multipart, Path},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::collections::HashMap;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::CurrentIdentity;

//ROUTERS
pub fn upload_routes() -> Router {
    Router::new()
        .route("/upload/image/", post(upload_image))
        .route("/media/:file", get(serve_media))
}

//ROUTES
async fn upload_image(
    Extension(identity): Extension<CurrentIdentity>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    identity.required()?;

    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => return Err(ApiError::field("file", "No file part in the request")),
        Err(_) => return Err(ApiError::field("file", "Malformed multipart body")),
    };

    let content_type = field
        .content_type()
        .map(|ct| ct.to_owned())
        .ok_or_else(|| ApiError::field("file", "Content type is not set"))?;

    let extension = *allowed_content_types()
        .get(content_type.as_str())
        .ok_or_else(|| ApiError::field("file", "Unsupported content type"))?;

    let file_name = field
        .name()
        .map(|name| name.to_owned())
        .ok_or_else(|| ApiError::field("file", "File name is not set"))?;
    if !FILE_NAME_REGEX.is_match(&file_name) {
        return Err(ApiError::field(
            "file",
            "Invalid file name. It should contain only Latin letters, numbers, '-', or '_'.",
        ));
    }

    let data = field
        .bytes()
        .await
        .map_err(|_| ApiError::field("file", "Failed to read file bytes"))?;
    if data.len() > file_size_limit() {
        return Ok((
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({ "error": "Payload too large" })),
        )
            .into_response());
    }

    let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
    let root = media_root();
    if let Err(err) = tokio::fs::create_dir_all(&root).await {
        tracing::error!(error = %err, "Failed to create media root");
        return Ok(internal_error());
    }
    if let Err(err) = tokio::fs::write(std::path::Path::new(&root).join(&stored_name), data).await
    {
        tracing::error!(error = %err, "Failed to store uploaded file");
        return Ok(internal_error());
    }

    Ok((StatusCode::CREATED, Json(json!({ "image": stored_name }))).into_response())
}

async fn serve_media(Path(file): Path<String>) -> Result<Response, ApiError> {
    if file.contains('/') || file.contains("..") {
        return Err(ApiError::not_found("Not found"));
    }

    let path = std::path::Path::new(&media_root()).join(&file);
    let opened = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("Not found"))?;

    let content_type = mime_guess::from_path(&path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    let stream = ReaderStream::new(opened);
    let body = Body::from_stream(stream);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("inline"),
    );

    Ok((headers, body).into_response())
}

//UTILS
fn allowed_content_types() -> HashMap<&'static str, &'static str> {
    HashMap::from([("image/jpeg", "jpg"), ("image/png", "png")])
}

static FILE_NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").unwrap());

fn media_root() -> String {
    std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string())
}

fn file_size_limit() -> usize {
    std::env::var("FILE_SIZE_LIMIT")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(5 * 1024 * 1024)
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}
