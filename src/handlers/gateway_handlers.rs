//! HTTP handlers for the four gateway operations, plus CORS preflight and the
//! catch-all fallback. Each handler performs exactly one bucket primitive and
//! shapes the response for the browser client.

use crate::{
    errors::AppError,
    models::responses::{DeleteResponse, ErrorResponse, FileEntry, ListResponse, UploadResponse},
    services::bucket::{ObjectMeta, PutOptions, SharedBucket},
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use futures::StreamExt;
use tracing::debug;
use uuid::Uuid;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// POST `/upload` — store one multipart file part under a new or
/// caller-supplied key.
///
/// The optional `key` text part allows deterministic overwrite; otherwise a
/// key of the form `{unix_millis}-{8-char base36}-{filename}` is synthesized,
/// which stays unique without a coordinator and keeps the original filename
/// readable in listings.
pub async fn upload_file(
    State(bucket): State<SharedBucket>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    // A body that is not multipart at all still gets the JSON error shape.
    let mut multipart = multipart.map_err(|rejection| AppError::internal(rejection.body_text()))?;

    let mut file: Option<(String, Option<String>, bytes::Bytes)> = None;
    let mut custom_key: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::internal(err.to_string()))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::internal(err.to_string()))?;
                file = Some((original_name, content_type, data));
            }
            Some("key") => {
                custom_key = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| AppError::internal(err.to_string()))?,
                );
            }
            other => debug!("ignoring unexpected multipart field {:?}", other),
        }
    }

    let Some((original_name, content_type, data)) = file else {
        return Err(AppError::bad_request("No file provided"));
    };

    let key = custom_key
        .filter(|key| !key.is_empty())
        .unwrap_or_else(|| synthesize_key(&original_name));

    let size = data.len() as u64;
    let uploaded_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let opts = PutOptions {
        content_type: content_type.clone(),
        meta: ObjectMeta {
            original_name: original_name.clone(),
            size: size.to_string(),
            uploaded_at,
        },
    };

    let body = futures::stream::once(async move { Ok(data) }).boxed();
    bucket.put(&key, body, opts).await?;

    let url = format!("/file/{}", urlencoding::encode(&key));
    Ok(Json(UploadResponse {
        success: true,
        key,
        url,
        name: original_name,
        size,
        content_type: content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.into()),
    }))
}

/// GET `/file/{key}` — stream the stored payload back as an attachment.
pub async fn download_file(
    State(bucket): State<SharedBucket>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let Some(object) = bucket.get(&key).await? else {
        return Err(AppError::not_found("File not found"));
    };

    let mut response = Response::new(Body::from_stream(object.body));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();

    let content_type = object
        .content_type
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.into());
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&object.size_bytes.max(0).to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );

    if let Some(etag) = object.etag.as_deref() {
        let quoted = format!("\"{}\"", etag);
        if let Ok(value) = HeaderValue::from_str(&quoted) {
            headers.insert(header::ETAG, value);
        }
    }

    let filename = object.original_name.unwrap_or_else(|| key.clone());
    let disposition = format!("attachment; filename=\"{}\"", filename);
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );

    Ok(response)
}

/// DELETE `/file/{key}` — unconditionally delete.
///
/// No existence check first: bucket delete of a missing key is a no-op, so
/// repeated deletes from a flaky client stay harmless.
pub async fn delete_file(
    State(bucket): State<SharedBucket>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    bucket.delete(&key).await?;

    Ok(Json(DeleteResponse {
        success: true,
        deleted: key,
    }))
}

/// GET `/list` — full listing, no filtering or pagination.
pub async fn list_files(
    State(bucket): State<SharedBucket>,
) -> Result<Json<ListResponse>, AppError> {
    let files = bucket
        .list()
        .await?
        .into_iter()
        .map(|obj| FileEntry {
            key: obj.key,
            size: obj.size_bytes,
            uploaded: obj.uploaded_at,
        })
        .collect();

    Ok(Json(ListResponse { files }))
}

/// OPTIONS on any matched route — empty 200; the CORS middleware supplies the
/// headers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Catch-all for unmatched method/path pairs: OPTIONS still gets an empty
/// 200, everything else is a JSON 404.
pub async fn route_fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not Found".into(),
        }),
    )
        .into_response()
}

/// Synthesize a storage key: `{unix_millis}-{suffix}-{original_name}`.
fn synthesize_key(original_name: &str) -> String {
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        random_suffix(),
        original_name
    )
}

/// Eight lowercase base36 characters drawn from a freshly generated UUID.
fn random_suffix() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut out = String::with_capacity(8);
    for _ in 0..8 {
        let digit = (n % 36) as u32;
        out.push(char::from_digit(digit, 36).unwrap_or('0'));
        n /= 36;
    }
    out
}
