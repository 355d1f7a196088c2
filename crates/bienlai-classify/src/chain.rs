//! The classifier chain and its fail-closed policy.

use std::sync::Arc;

use bienlai_core::constants::DOCUMENT_LABEL_ALLOWLIST;
use bienlai_core::AppError;

use crate::verdict::{LabelClassifier, ReceiptClassifier, Verdict};

/// Rejection message for a parsed negative verdict.
pub const NOT_RECEIPT_MESSAGE: &str =
    "Ảnh không giống hóa đơn hay biên lai. Vui lòng chụp lại.";

/// Distinct message for total classifier failure (fail-closed).
pub const CANNOT_VERIFY_MESSAGE: &str =
    "Không thể xác minh nội dung ảnh, vui lòng thử lại.";

/// Primary classifier plus optional fallback.
///
/// Policy:
/// - primary affirmative → admit
/// - primary negative → reject (the fallback is never consulted for a
///   parsed negative, only for call failures)
/// - primary call failed → fallback labels checked against the
///   document-term allow-list
/// - fallback also failed (or absent) → reject with a distinct
///   server-error-class message; inability to classify is never a pass
pub struct ClassifierChain {
    primary: Arc<dyn ReceiptClassifier>,
    fallback: Option<Arc<dyn LabelClassifier>>,
}

impl ClassifierChain {
    pub fn new(
        primary: Arc<dyn ReceiptClassifier>,
        fallback: Option<Arc<dyn LabelClassifier>>,
    ) -> Self {
        ClassifierChain { primary, fallback }
    }

    /// Decide whether the payload may be persisted.
    pub async fn admit(&self, image: &[u8], content_type: &str) -> Result<(), AppError> {
        match self.primary.classify(image, content_type).await {
            Verdict::Affirmative => {
                tracing::debug!(classifier = self.primary.name(), "Receipt admitted");
                Ok(())
            }
            Verdict::Negative { answer } => {
                tracing::info!(
                    classifier = self.primary.name(),
                    answer = %answer,
                    "Receipt rejected by primary classifier"
                );
                Err(AppError::ClassificationRejected(
                    NOT_RECEIPT_MESSAGE.to_string(),
                ))
            }
            Verdict::CallFailed { reason } => self.admit_via_fallback(image, &reason).await,
        }
    }

    async fn admit_via_fallback(&self, image: &[u8], primary_reason: &str) -> Result<(), AppError> {
        let Some(fallback) = &self.fallback else {
            tracing::error!(
                primary_error = %primary_reason,
                "Primary classifier failed and no fallback is configured"
            );
            return Err(AppError::ClassificationUnavailable(
                CANNOT_VERIFY_MESSAGE.to_string(),
            ));
        };

        match fallback.detect_labels(image).await {
            Ok(labels) => {
                if labels.iter().any(|label| is_document_label(label)) {
                    tracing::info!(
                        classifier = fallback.name(),
                        primary_error = %primary_reason,
                        "Receipt admitted via fallback labels"
                    );
                    Ok(())
                } else {
                    tracing::info!(
                        classifier = fallback.name(),
                        labels = ?labels,
                        "No document-like label found, rejecting"
                    );
                    Err(AppError::ClassificationRejected(
                        NOT_RECEIPT_MESSAGE.to_string(),
                    ))
                }
            }
            Err(fallback_reason) => {
                tracing::error!(
                    primary_error = %primary_reason,
                    fallback_error = %fallback_reason,
                    "Both classifiers failed, failing closed"
                );
                Err(AppError::ClassificationUnavailable(
                    CANNOT_VERIFY_MESSAGE.to_string(),
                ))
            }
        }
    }
}

fn is_document_label(label: &str) -> bool {
    let normalized = label.to_lowercase();
    DOCUMENT_LABEL_ALLOWLIST
        .iter()
        .any(|term| normalized == *term || normalized.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bienlai_core::ErrorMetadata;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FixedPrimary(Verdict);

    #[async_trait]
    impl ReceiptClassifier for FixedPrimary {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn classify(&self, _image: &[u8], _content_type: &str) -> Verdict {
            self.0.clone()
        }
    }

    struct FixedFallback {
        result: Result<Vec<String>, String>,
        called: AtomicBool,
    }

    impl FixedFallback {
        fn new(result: Result<Vec<String>, String>) -> Arc<Self> {
            Arc::new(FixedFallback {
                result,
                called: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl LabelClassifier for FixedFallback {
        fn name(&self) -> &str {
            "fixed-labels"
        }

        async fn detect_labels(&self, _image: &[u8]) -> Result<Vec<String>, String> {
            self.called.store(true, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn labels(names: &[&str]) -> Result<Vec<String>, String> {
        Ok(names.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn test_affirmative_admits() {
        let chain = ClassifierChain::new(Arc::new(FixedPrimary(Verdict::Affirmative)), None);
        assert!(chain.admit(b"img", "image/jpeg").await.is_ok());
    }

    #[tokio::test]
    async fn test_negative_rejects_without_consulting_fallback() {
        let fallback = FixedFallback::new(labels(&["receipt"]));
        let chain = ClassifierChain::new(
            Arc::new(FixedPrimary(Verdict::Negative {
                answer: "NO".to_string(),
            })),
            Some(fallback.clone()),
        );

        let err = chain.admit(b"img", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, AppError::ClassificationRejected(_)));
        // A parsed negative must never trigger the fallback.
        assert!(!fallback.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_call_failure_with_document_label_admits() {
        let fallback = FixedFallback::new(labels(&["Paper", "Text"]));
        let chain = ClassifierChain::new(
            Arc::new(FixedPrimary(Verdict::CallFailed {
                reason: "timeout".to_string(),
            })),
            Some(fallback.clone()),
        );

        assert!(chain.admit(b"img", "image/jpeg").await.is_ok());
        assert!(fallback.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_call_failure_with_unrelated_labels_rejects() {
        let fallback = FixedFallback::new(labels(&["dog", "animal"]));
        let chain = ClassifierChain::new(
            Arc::new(FixedPrimary(Verdict::CallFailed {
                reason: "timeout".to_string(),
            })),
            Some(fallback),
        );

        let err = chain.admit(b"img", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, AppError::ClassificationRejected(_)));
    }

    #[tokio::test]
    async fn test_both_failed_fails_closed_with_distinct_error() {
        let fallback = FixedFallback::new(Err("rekognition down".to_string()));
        let chain = ClassifierChain::new(
            Arc::new(FixedPrimary(Verdict::CallFailed {
                reason: "timeout".to_string(),
            })),
            Some(fallback),
        );

        let err = chain.admit(b"img", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, AppError::ClassificationUnavailable(_)));
        assert_eq!(err.client_message(), CANNOT_VERIFY_MESSAGE);
    }

    #[tokio::test]
    async fn test_call_failure_without_fallback_fails_closed() {
        let chain = ClassifierChain::new(
            Arc::new(FixedPrimary(Verdict::CallFailed {
                reason: "timeout".to_string(),
            })),
            None,
        );

        let err = chain.admit(b"img", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, AppError::ClassificationUnavailable(_)));
    }

    #[test]
    fn test_is_document_label_matches_allowlist() {
        assert!(is_document_label("Receipt"));
        assert!(is_document_label("paper"));
        assert!(is_document_label("Web Page"));
        assert!(!is_document_label("dog"));
    }
}
