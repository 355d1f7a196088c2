//! HTTP error response conversion.
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Domain errors
//! convert into `HttpAppError` and render consistently (status, JSON body,
//! logging).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use bienlai_core::{AppError, ErrorMetadata, LogLevel};
use bienlai_storage::StorageError;

/// JSON body for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Client-facing message, safe to surface verbatim.
    pub error: String,
    /// Machine-readable error code (e.g. "QUOTA_EXCEEDED").
    pub code: String,
}

/// Wrapper for AppError to implement IntoResponse. Needed because of the
/// orphan rule: IntoResponse and AppError both live in other crates.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::NotFound(msg) => AppError::InvalidInput(msg),
            StorageError::UploadFailed(msg)
            | StorageError::DeleteFailed(msg)
            | StorageError::BackendError(msg)
            | StorageError::ConfigError(msg) => AppError::Storage(msg),
            StorageError::IoError(err) => AppError::Storage(format!("IO error: {}", err)),
        };
        HttpAppError(app)
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Request rejected");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Request failed");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = Json(ErrorResponse {
            success: false,
            error: app_error.client_message(),
            code: app_error.error_code().to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_storage_error_invalid_key_is_client_error() {
        let HttpAppError(app) = StorageError::InvalidKey("bad key".to_string()).into();
        match app {
            AppError::InvalidInput(msg) => assert_eq!(msg, "bad key"),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_from_storage_error_upload_failed_is_storage_error() {
        let HttpAppError(app) = StorageError::UploadFailed("disk full".to_string()).into();
        assert!(matches!(app, AppError::Storage(_)));
        assert_eq!(app.http_status_code(), 500);
    }

    #[test]
    fn test_error_response_shape() {
        let response = ErrorResponse {
            success: false,
            error: "Ảnh vượt quá giới hạn 5 MB.".to_string(),
            code: "PAYLOAD_TOO_LARGE".to_string(),
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json.get("success").and_then(|v| v.as_bool()), Some(false));
        assert!(json.get("error").and_then(|v| v.as_str()).is_some());
        assert_eq!(
            json.get("code").and_then(|v| v.as_str()),
            Some("PAYLOAD_TOO_LARGE")
        );
    }
}
