//! Fallback label classifier backed by AWS Rekognition DetectLabels.
//!
//! Consulted only when the primary vision classifier call fails. Returns
//! generic image labels; the chain decides whether any of them look
//! document-like.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::Image;
use aws_sdk_rekognition::Client as RekognitionClient;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::verdict::LabelClassifier;

const MAX_LABELS: i32 = 50;
const DEFAULT_MIN_CONFIDENCE: f32 = 70.0;

/// Rekognition-backed fallback classifier.
pub struct RekognitionLabelClassifier {
    client: RekognitionClient,
    min_confidence: f32,
}

impl Debug for RekognitionLabelClassifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RekognitionLabelClassifier").finish()
    }
}

impl RekognitionLabelClassifier {
    /// Create a Rekognition client for the given region.
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        RekognitionLabelClassifier {
            client: RekognitionClient::new(&config),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }
}

#[async_trait]
impl LabelClassifier for RekognitionLabelClassifier {
    fn name(&self) -> &str {
        "rekognition"
    }

    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<String>, String> {
        let result = self
            .client
            .detect_labels()
            .image(Image::builder().bytes(Blob::new(image)).build())
            .max_labels(MAX_LABELS)
            .min_confidence(self.min_confidence)
            .send()
            .await
            .map_err(|e| format!("Rekognition DetectLabels failed: {}", e))?;

        let labels: Vec<String> = result
            .labels()
            .iter()
            .filter_map(|label| label.name())
            .map(|name| name.to_lowercase())
            .collect();

        tracing::debug!(
            classifier = "rekognition",
            label_count = labels.len(),
            "Fallback labels detected"
        );

        Ok(labels)
    }
}
