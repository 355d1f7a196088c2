use async_trait::async_trait;

/// Three-way classification result.
///
/// A parsed negative answer and a failed classifier call are different
/// things: the fallback classifier is consulted only on `CallFailed`,
/// never on `Negative`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The classifier answered the receipt question affirmatively.
    Affirmative,
    /// The classifier answered, and the answer was not affirmative.
    Negative {
        /// Raw response text, kept for logging only; never persisted.
        answer: String,
    },
    /// The call itself failed (network, auth, malformed response).
    CallFailed { reason: String },
}

/// A classifier answering the fixed yes/no receipt-detection question.
#[async_trait]
pub trait ReceiptClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// Never returns an error: call failures are part of the verdict.
    async fn classify(&self, image: &[u8], content_type: &str) -> Verdict;
}

/// A general-purpose classifier returning generic image labels,
/// used as the fallback when the primary call fails.
#[async_trait]
pub trait LabelClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// Lowercased label names, or the failure reason.
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<String>, String>;
}
