//! Collaborator seams for the intake pipeline.

use async_trait::async_trait;
use uuid::Uuid;

use bienlai_core::models::{ContentFingerprint, LineItem, QuotaDecision, UploadDescriptor};
use bienlai_core::AppError;

use crate::context::IntakeContext;

/// Daily upload quota guard. Consuming and checking are one atomic act.
#[async_trait]
pub trait QuotaGate: Send + Sync {
    /// The configured daily ceiling, used in user-facing messages.
    fn daily_limit(&self) -> i32;

    /// Atomically consume one unit of today's quota, or deny.
    async fn try_consume(&self, owner_id: Uuid) -> Result<QuotaDecision, AppError>;

    /// Today's consumed count, read-only.
    async fn today_count(&self, owner_id: Uuid) -> Result<i32, AppError>;
}

/// Lookup of already-ingested receipt fingerprints.
#[async_trait]
pub trait DuplicateIndex: Send + Sync {
    async fn contains(
        &self,
        owner_id: Uuid,
        fingerprint: &ContentFingerprint,
    ) -> Result<bool, AppError>;
}

/// Upload of the (compressed) receipt image through the gatekeeper.
#[async_trait]
pub trait ReceiptUploader: Send + Sync {
    async fn upload(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadDescriptor, AppError>;
}

/// Extraction of expense line items from the uploaded receipt.
///
/// Runs only after the upload succeeded and receives the stored copy's
/// descriptor, so the extractor reads the image by its public URL.
#[async_trait]
pub trait ReceiptAnalyzer: Send + Sync {
    async fn analyze(&self, receipt: &UploadDescriptor) -> Result<Vec<LineItem>, AppError>;
}

/// Persistence boundary for reviewed expenses.
#[async_trait]
pub trait ExpenseSink: Send + Sync {
    /// Commit every reviewed row, all or nothing. Returns the row count.
    #[allow(clippy::too_many_arguments)]
    async fn commit_expenses(
        &self,
        context: &IntakeContext,
        project: &str,
        category: &str,
        fingerprint: &ContentFingerprint,
        receipt_url: &str,
        items: &[LineItem],
    ) -> Result<u64, AppError>;
}

/// Analyzer used when no extraction collaborator is bound: returns no rows,
/// leaving the review stage to manual entry.
#[derive(Debug, Default)]
pub struct ManualEntryAnalyzer;

#[async_trait]
impl ReceiptAnalyzer for ManualEntryAnalyzer {
    async fn analyze(&self, _receipt: &UploadDescriptor) -> Result<Vec<LineItem>, AppError> {
        Ok(Vec::new())
    }
}
