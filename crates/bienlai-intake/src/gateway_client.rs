//! HTTP client for the upload gateway.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use bienlai_core::constants::EXTERNAL_CALL_TIMEOUT_SECS;
use bienlai_core::models::UploadDescriptor;
use bienlai_core::AppError;

use crate::traits::ReceiptUploader;

/// Talks the gatekeeper contract: `PUT {base}/?file=<key>` with the raw
/// image bytes as the body. Calls are bounded by a 20 second timeout;
/// timeouts and connection failures surface as transient errors.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GatewaySuccess {
    url: String,
    filename: String,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct GatewayFailure {
    #[serde(default)]
    error: String,
    #[serde(default)]
    code: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, anyhow::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(EXTERNAL_CALL_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client for the upload gateway")?;

        Ok(GatewayClient {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn map_request_error(err: reqwest::Error) -> AppError {
        if err.is_timeout() || err.is_connect() {
            AppError::Transient(format!("Gateway unreachable: {}", err))
        } else {
            AppError::Internal(format!("Gateway request failed: {}", err))
        }
    }

    /// Map the gateway's machine error code back onto the domain error the
    /// pipeline expects, falling back on the raw message.
    fn map_rejection(code: &str, message: String) -> AppError {
        match code {
            "NOT_A_RECEIPT" => AppError::ClassificationRejected(message),
            "CLASSIFIER_UNAVAILABLE" => AppError::ClassificationUnavailable(message),
            "PAYLOAD_TOO_LARGE" => AppError::PayloadTooLarge(message),
            "INVALID_INPUT" => AppError::InvalidInput(message),
            _ => AppError::Storage(message),
        }
    }
}

#[async_trait]
impl ReceiptUploader for GatewayClient {
    async fn upload(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadDescriptor, AppError> {
        let size = data.len();

        // The key goes through `query` so reserved characters in it are
        // percent-encoded on the wire.
        let response = self
            .http_client
            .put(format!("{}/", self.base_url))
            .query(&[("file", storage_key)])
            .header("content-type", content_type)
            .body(data)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        if status.is_success() {
            let body: GatewaySuccess = response.json().await.map_err(|e| {
                AppError::Internal(format!("Malformed gateway response: {}", e))
            })?;

            tracing::debug!(key = %storage_key, size_bytes = size, "Receipt uploaded");
            return Ok(UploadDescriptor {
                url: body.url,
                filename: body.filename,
                size: body.size,
            });
        }

        let failure = response.json::<GatewayFailure>().await.unwrap_or_else(|_| {
            GatewayFailure {
                error: format!("Gateway returned {}", status),
                code: String::new(),
            }
        });

        tracing::warn!(
            key = %storage_key,
            status = status.as_u16(),
            code = %failure.code,
            "Gateway rejected upload"
        );
        Err(Self::map_rejection(&failure.code, failure.error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> GatewayClient {
        GatewayClient::new(base_url).unwrap()
    }

    #[tokio::test]
    async fn test_upload_success_parses_the_descriptor() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/")
            .match_query(mockito::Matcher::UrlEncoded(
                "file".into(),
                "receipts/2026/08/a.jpg".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"url":"http://localhost:8787/receipts/2026/08/a.jpg","filename":"receipts/2026/08/a.jpg","size":3}"#,
            )
            .create_async()
            .await;

        let descriptor = client(&server.url())
            .upload("receipts/2026/08/a.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .expect("upload");

        mock.assert_async().await;
        assert_eq!(descriptor.filename, "receipts/2026/08/a.jpg");
        assert_eq!(descriptor.size, 3);
        assert!(descriptor.url.ends_with("a.jpg"));
    }

    #[tokio::test]
    async fn test_storage_key_is_url_encoded_in_the_query() {
        let mut server = mockito::Server::new_async().await;
        let key = "receipts/2026/08/hóa đơn&co.jpg";
        let mock = server
            .mock("PUT", "/")
            .match_query(mockito::Matcher::UrlEncoded("file".into(), key.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"url":"http://localhost:8787/x.jpg","filename":"x.jpg","size":1}"#,
            )
            .create_async()
            .await;

        client(&server.url())
            .upload(key, vec![1], "image/jpeg")
            .await
            .expect("upload");

        // UrlEncoded only matches when the raw query was properly encoded,
        // so a literal '&' or space in the key would miss the mock.
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_classifier_rejection_maps_to_domain_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", mockito::Matcher::Any)
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":false,"error":"Ảnh không giống hóa đơn hay biên lai. Vui lòng chụp lại.","code":"NOT_A_RECEIPT"}"#,
            )
            .create_async()
            .await;

        let err = client(&server.url())
            .upload("a.jpg", vec![1], "image/jpeg")
            .await
            .unwrap_err();

        match err {
            AppError::ClassificationRejected(msg) => assert!(msg.contains("hóa đơn")),
            other => panic!("expected ClassificationRejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversize_rejection_maps_to_payload_too_large() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", mockito::Matcher::Any)
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":false,"error":"Ảnh vượt quá giới hạn 5 MB.","code":"PAYLOAD_TOO_LARGE"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .upload("a.jpg", vec![1], "image/jpeg")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_transient() {
        // Nothing listens on this port.
        let err = client("http://127.0.0.1:1")
            .upload("a.jpg", vec![1], "image/jpeg")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Transient(_)));
    }
}
