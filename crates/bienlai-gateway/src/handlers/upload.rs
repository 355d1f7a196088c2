//! Receipt upload handler.
//!
//! The gatekeeper contract: `PUT /?file=<storage-key>` with the raw image
//! bytes as the body. Checks run in order (key, body, size ceiling,
//! classification) and the first failure wins; storage is only touched
//! after every check passed.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use bienlai_core::AppError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Storage key for the object, chosen by the client.
    pub file: Option<String>,
}

/// Body of a successful upload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Always `true`.
    pub success: bool,
    /// Publicly resolvable URL of the stored object.
    pub url: String,
    /// The storage key the object was written under.
    pub filename: String,
    /// Stored size in bytes.
    pub size: u64,
}

/// Upload a receipt image.
///
/// The size ceiling is inclusive: a body of exactly `max_upload_bytes`
/// passes, one byte more is rejected. Oversized and malformed requests are
/// both client errors (400); a classifier rejection is 403; an unavailable
/// classifier chain fails closed with 500.
#[utoipa::path(
    put,
    path = "/",
    tag = "upload",
    params(
        ("file" = String, Query, description = "Storage key for the uploaded image")
    ),
    request_body(content = inline(Object), content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Receipt stored", body = UploadResponse),
        (status = 400, description = "Missing key, empty body or payload too large", body = ErrorResponse),
        (status = 403, description = "Content rejected by the classifier", body = ErrorResponse),
        (status = 500, description = "Classifier unavailable or storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, body), fields(operation = "upload_receipt"))]
pub async fn upload_receipt(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let storage_key = match query.file.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => {
            return Err(AppError::InvalidInput(
                "Thiếu tên tệp (tham số ?file=).".to_string(),
            )
            .into())
        }
    };

    if body.is_empty() {
        return Err(AppError::InvalidInput("Tệp tải lên rỗng.".to_string()).into());
    }

    if body.len() > state.max_upload_bytes {
        let max_mb = state.max_upload_bytes / (1024 * 1024);
        return Err(AppError::PayloadTooLarge(format!(
            "Ảnh vượt quá giới hạn {} MB.",
            max_mb
        ))
        .into());
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    match &state.classifier {
        Some(chain) => chain.admit(&body, &content_type).await?,
        None => {
            tracing::debug!(key = %storage_key, "Classifier not configured, skipping content check");
        }
    }

    let size = body.len() as u64;
    let url = state
        .storage
        .upload_with_key(&storage_key, body.to_vec(), &content_type)
        .await?;

    tracing::info!(key = %storage_key, size_bytes = size, "Receipt stored");

    Ok(Json(UploadResponse {
        success: true,
        url,
        filename: storage_key,
        size,
    }))
}
