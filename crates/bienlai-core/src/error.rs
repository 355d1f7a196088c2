//! Error types module
//!
//! All errors in the intake pipeline are unified under the `AppError` enum,
//! which can represent database, storage, classification and quota errors.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature. With `default-features = false`, build without the `sqlx` feature;
//! then `AppError` has no sqlx-backed database variant.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like quota limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// This trait allows errors to self-describe their HTTP response characteristics.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "QUOTA_EXCEEDED")
    fn error_code(&self) -> &'static str;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Content rejected by classifier: {0}")]
    ClassificationRejected(String),

    #[error("Classifier chain unavailable: {0}")]
    ClassificationUnavailable(String),

    #[error("Duplicate receipt: fingerprint already on record")]
    DuplicateDetected,

    #[error("Daily upload quota of {limit} exceeded")]
    QuotaExceeded { limit: i32 },

    #[error("Receipt analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, LogLevel) {
    match err {
        AppError::Database(_) => (500, "DATABASE_ERROR", LogLevel::Error),
        AppError::Storage(_) => (500, "STORAGE_ERROR", LogLevel::Error),
        // Malformed and oversized requests are both client errors with
        // status 400.
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", LogLevel::Debug),
        AppError::PayloadTooLarge(_) => (400, "PAYLOAD_TOO_LARGE", LogLevel::Debug),
        AppError::ClassificationRejected(_) => (403, "NOT_A_RECEIPT", LogLevel::Debug),
        AppError::ClassificationUnavailable(_) => {
            (500, "CLASSIFIER_UNAVAILABLE", LogLevel::Error)
        }
        AppError::DuplicateDetected => (409, "DUPLICATE_RECEIPT", LogLevel::Debug),
        AppError::QuotaExceeded { .. } => (429, "QUOTA_EXCEEDED", LogLevel::Warn),
        AppError::AnalysisFailed(_) => (502, "ANALYSIS_FAILED", LogLevel::Warn),
        AppError::Transient(_) => (503, "TRANSIENT_FAILURE", LogLevel::Warn),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", LogLevel::Error),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::ClassificationRejected(_) => "ClassificationRejected",
            AppError::ClassificationUnavailable(_) => "ClassificationUnavailable",
            AppError::DuplicateDetected => "DuplicateDetected",
            AppError::QuotaExceeded { .. } => "QuotaExceeded",
            AppError::AnalysisFailed(_) => "AnalysisFailed",
            AppError::Transient(_) => "Transient",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Không thể truy cập cơ sở dữ liệu.".to_string(),
            AppError::Storage(_) => "Không thể lưu trữ tệp.".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::ClassificationRejected(ref msg) => msg.clone(),
            AppError::ClassificationUnavailable(ref msg) => msg.clone(),
            AppError::DuplicateDetected => {
                "Ảnh hóa đơn này đã được tải lên trước đó.".to_string()
            }
            AppError::QuotaExceeded { limit } => {
                format!("Đã đạt giới hạn {} ảnh tải lên trong ngày.", limit)
            }
            AppError::AnalysisFailed(_) => {
                "Không thể phân tích hóa đơn, vui lòng thử lại.".to_string()
            }
            AppError::Transient(_) => {
                "Kết nối gián đoạn, vui lòng thử lại sau.".to_string()
            }
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
