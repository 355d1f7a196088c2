//! Primary vision-language classifier using Anthropic's Messages API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::verdict::{ReceiptClassifier, Verdict};
use bienlai_core::constants::EXTERNAL_CALL_TIMEOUT_SECS;

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// The fixed closed-form question, constrained to a one-word answer.
const RECEIPT_QUESTION: &str = "Đây có phải là ảnh chụp hóa đơn, biên lai hay phiếu thanh toán không? \
     Is this photo a receipt, invoice or bill? Answer with exactly one word: YES or NO.";

const MAX_ANSWER_TOKENS: u32 = 8;

/// Primary receipt classifier: one vision-language call per request.
pub struct VisionReceiptClassifier {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl Debug for VisionReceiptClassifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VisionReceiptClassifier")
            .field("model", &self.model)
            .finish()
    }
}

// Messages API request/response structures
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<MessageParam>,
}

#[derive(Debug, Serialize)]
struct MessageParam {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

/// The answer may arrive in either of two fields depending on the API
/// surface: the `content` block list, or a legacy top-level `completion`.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlockResponse>,
    #[serde(default)]
    completion: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockResponse {
    Text { text: String },
}

impl VisionReceiptClassifier {
    pub fn new(api_key: String, model: String) -> Result<Self, anyhow::Error> {
        use anyhow::Context;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(EXTERNAL_CALL_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client for the vision classifier")?;

        Ok(Self {
            http_client,
            api_key,
            model,
            base_url: API_BASE.to_string(),
        })
    }

    /// Point the classifier at a different API host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Case-insensitive affirmative-token search across both possible
    /// response fields.
    fn parse_answer(response: &MessagesResponse) -> Verdict {
        let content_text = response
            .content
            .iter()
            .map(|b| match b {
                ContentBlockResponse::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        let completion_text = response.completion.as_deref().unwrap_or("");

        let combined = format!("{} {}", content_text, completion_text);
        if combined.to_lowercase().contains("yes") {
            Verdict::Affirmative
        } else {
            Verdict::Negative {
                answer: combined.trim().to_string(),
            }
        }
    }

    async fn ask(&self, image: &[u8], content_type: &str) -> Result<Verdict, String> {
        use base64::Engine;
        let base64_image = base64::engine::general_purpose::STANDARD.encode(image);

        let media_type = if content_type.starts_with("image/") {
            content_type.to_string()
        } else {
            detect_media_type(image).to_string()
        };

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_ANSWER_TOKENS,
            messages: vec![MessageParam {
                role: "user".to_string(),
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64".to_string(),
                            media_type,
                            data: base64_image,
                        },
                    },
                    ContentBlock::Text {
                        text: RECEIPT_QUESTION.to_string(),
                    },
                ],
            }],
        };

        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Vision classifier request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(format!(
                "Vision classifier returned {}: {}",
                status, error_text
            ));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse vision classifier response: {}", e))?;

        Ok(Self::parse_answer(&parsed))
    }
}

#[async_trait]
impl ReceiptClassifier for VisionReceiptClassifier {
    fn name(&self) -> &str {
        "vision"
    }

    async fn classify(&self, image: &[u8], content_type: &str) -> Verdict {
        match self.ask(image, content_type).await {
            Ok(verdict) => verdict,
            Err(reason) => {
                tracing::warn!(classifier = "vision", reason = %reason, "Classifier call failed");
                Verdict::CallFailed { reason }
            }
        }
    }
}

/// Detect media type from image data using magic numbers
fn detect_media_type(data: &[u8]) -> &'static str {
    if data.len() < 4 {
        return "image/jpeg"; // Default
    }

    // JPEG: FF D8 FF
    if data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        return "image/jpeg";
    }

    // PNG: 89 50 4E 47
    if data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47 {
        return "image/png";
    }

    // WebP: RIFF ... WEBP
    if data.len() >= 12
        && data[0] == 0x52
        && data[1] == 0x49
        && data[2] == 0x46
        && data[3] == 0x46
        && data[8] == 0x57
        && data[9] == 0x45
        && data[10] == 0x42
        && data[11] == 0x50
    {
        return "image/webp";
    }

    "image/jpeg" // Default
}
