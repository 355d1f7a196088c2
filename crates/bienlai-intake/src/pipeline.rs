//! The intake pipeline: one receipt attempt from image to saved expenses.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use bienlai_core::models::{ContentFingerprint, ImageBlob, LineItem};
use bienlai_core::AppError;
use bienlai_processing::compression::{CompressionSettings, ImageCompressor};
use bienlai_processing::hasher;

use crate::context::IntakeContext;
use crate::stage::{IntakeError, IntakeStage};
use crate::traits::{DuplicateIndex, ExpenseSink, QuotaGate, ReceiptAnalyzer, ReceiptUploader};

/// Editable state handed to the user between Analyzing and Saving.
///
/// The fingerprint and the uploaded URL are retained so the commit can
/// attach them to every expense row. Items may be edited, removed or added
/// by hand before the commit.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    pub line_items: Vec<LineItem>,
    pub fingerprint: ContentFingerprint,
    pub receipt_url: String,
    pub project: Option<String>,
    pub category: Option<String>,
}

impl ReviewSession {
    /// A session is committable with at least one positive-amount row and a
    /// selected project and category.
    pub fn can_commit(&self) -> bool {
        let has_project = self
            .project
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty());
        let has_category = self
            .category
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());
        has_project
            && has_category
            && self.line_items.iter().any(LineItem::has_positive_amount)
    }
}

/// Drives one receipt attempt through the stage machine.
///
/// Stage order is fixed: CheckingLimit, Hashing (fingerprint plus duplicate
/// lookup), Compressing, Uploading, Analyzing, then Review and Saving via
/// [`ReviewSession`]. The quota unit is consumed before the duplicate
/// lookup runs, so a duplicate attempt costs one unit of today's quota.
pub struct IntakePipeline {
    context: IntakeContext,
    quota: Arc<dyn QuotaGate>,
    duplicates: Arc<dyn DuplicateIndex>,
    uploader: Arc<dyn ReceiptUploader>,
    analyzer: Arc<dyn ReceiptAnalyzer>,
    sink: Arc<dyn ExpenseSink>,
    compression: CompressionSettings,
}

impl IntakePipeline {
    pub fn new(
        context: IntakeContext,
        quota: Arc<dyn QuotaGate>,
        duplicates: Arc<dyn DuplicateIndex>,
        uploader: Arc<dyn ReceiptUploader>,
        analyzer: Arc<dyn ReceiptAnalyzer>,
        sink: Arc<dyn ExpenseSink>,
    ) -> Self {
        IntakePipeline {
            context,
            quota,
            duplicates,
            uploader,
            analyzer,
            sink,
            compression: CompressionSettings::default(),
        }
    }

    pub fn with_compression_settings(mut self, settings: CompressionSettings) -> Self {
        self.compression = settings;
        self
    }

    /// Run CheckingLimit through Analyzing. On success the pipeline is in
    /// Review, represented by the returned session. On failure every
    /// in-flight artifact is dropped and the stage is reported in the error.
    pub async fn begin(&self, image: ImageBlob) -> Result<ReviewSession, IntakeError> {
        let owner_id = self.context.owner_id;

        // CheckingLimit. A guard error fails closed: no upload without a
        // positive quota decision.
        let decision = self
            .quota
            .try_consume(owner_id)
            .await
            .map_err(|e| IntakeError::at(IntakeStage::CheckingLimit, e))?;
        if !decision.allowed {
            return Err(IntakeError::at(
                IntakeStage::CheckingLimit,
                AppError::QuotaExceeded {
                    limit: self.quota.daily_limit(),
                },
            ));
        }

        // Hashing. The fingerprint is taken over the original bytes, and
        // the duplicate lookup runs after the quota unit was consumed.
        let fingerprint = hasher::fingerprint(&image.data);
        let is_duplicate = self
            .duplicates
            .contains(owner_id, &fingerprint)
            .await
            .map_err(|e| IntakeError::at(IntakeStage::Hashing, e))?;
        if is_duplicate {
            tracing::info!(fingerprint = %fingerprint, "Duplicate receipt rejected");
            return Err(IntakeError::at(
                IntakeStage::Hashing,
                AppError::DuplicateDetected,
            ));
        }

        // Compressing is CPU-bound, so it runs off the async runtime.
        let settings = self.compression;
        let original = image.data;
        let declared_type = image.content_type;
        let compressed = tokio::task::spawn_blocking(move || {
            ImageCompressor::new(settings).compress(&original, &declared_type)
        })
        .await
        .map_err(|e| {
            IntakeError::at(
                IntakeStage::Compressing,
                AppError::Internal(format!("Compression task failed: {}", e)),
            )
        })?;

        // Uploading through the gatekeeper.
        let storage_key = generate_storage_key();
        let descriptor = self
            .uploader
            .upload(
                &storage_key,
                compressed.data.to_vec(),
                compressed.content_type,
            )
            .await
            .map_err(|e| IntakeError::at(IntakeStage::Uploading, e))?;

        // Analyzing the stored derivative into line items. The analyzer
        // reads the receipt back by its uploaded URL.
        let line_items = self
            .analyzer
            .analyze(&descriptor)
            .await
            .map_err(|e| IntakeError::at(IntakeStage::Analyzing, e))?;

        tracing::info!(
            key = %storage_key,
            items = line_items.len(),
            "Receipt ready for review"
        );

        Ok(ReviewSession {
            line_items,
            fingerprint,
            receipt_url: descriptor.url,
            project: None,
            category: None,
        })
    }

    /// Saving. On failure the session is handed back so the user stays in
    /// Review and may retry; the attempt never falls back to Idle.
    pub async fn commit(
        &self,
        session: ReviewSession,
    ) -> Result<u64, (ReviewSession, IntakeError)> {
        if !session.can_commit() {
            let err = IntakeError::at(
                IntakeStage::Saving,
                AppError::InvalidInput(
                    "Cần ít nhất một dòng chi phí hợp lệ, dự án và hạng mục.".to_string(),
                ),
            );
            return Err((session, err));
        }

        // can_commit() guarantees both are present and non-empty.
        let (Some(project), Some(category)) = (session.project.clone(), session.category.clone())
        else {
            let err = IntakeError::at(
                IntakeStage::Saving,
                AppError::Internal("Review session lost its project selection".to_string()),
            );
            return Err((session, err));
        };

        match self
            .sink
            .commit_expenses(
                &self.context,
                &project,
                &category,
                &session.fingerprint,
                &session.receipt_url,
                &session.line_items,
            )
            .await
        {
            Ok(rows) => {
                tracing::info!(rows, project = %project, "Expenses saved");
                Ok(rows)
            }
            Err(e) => Err((session, IntakeError::at(IntakeStage::Saving, e))),
        }
    }

    /// Uploads left today for this owner scope.
    pub async fn remaining_today(&self) -> Result<i32, AppError> {
        let used = self.quota.today_count(self.context.owner_id).await?;
        Ok((self.quota.daily_limit() - used).max(0))
    }
}

/// Month-bucketed unique storage key for the uploaded derivative.
fn generate_storage_key() -> String {
    format!(
        "receipts/{}/{}.jpg",
        Utc::now().format("%Y/%m"),
        Uuid::new_v4()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use bienlai_core::models::{QuotaDecision, UploadDescriptor};
    use bienlai_core::ErrorMetadata;

    const DAILY_LIMIT: i32 = 30;

    struct MockQuota {
        allow: bool,
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockQuota {
        fn allowing() -> Arc<Self> {
            Arc::new(MockQuota {
                allow: true,
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn denying() -> Arc<Self> {
            Arc::new(MockQuota {
                allow: false,
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(MockQuota {
                allow: true,
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QuotaGate for MockQuota {
        fn daily_limit(&self) -> i32 {
            DAILY_LIMIT
        }

        async fn try_consume(&self, _owner_id: Uuid) -> Result<QuotaDecision, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Internal("quota store unreachable".to_string()));
            }
            if self.allow {
                Ok(QuotaDecision::allowed(1, DAILY_LIMIT))
            } else {
                Ok(QuotaDecision::denied(DAILY_LIMIT))
            }
        }

        async fn today_count(&self, _owner_id: Uuid) -> Result<i32, AppError> {
            Ok(self.calls.load(Ordering::SeqCst) as i32)
        }
    }

    struct MockDuplicates {
        exists: bool,
        calls: AtomicUsize,
    }

    impl MockDuplicates {
        fn empty() -> Arc<Self> {
            Arc::new(MockDuplicates {
                exists: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn containing() -> Arc<Self> {
            Arc::new(MockDuplicates {
                exists: true,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DuplicateIndex for MockDuplicates {
        async fn contains(
            &self,
            _owner_id: Uuid,
            _fingerprint: &ContentFingerprint,
        ) -> Result<bool, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.exists)
        }
    }

    struct MockUploader {
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockUploader {
        fn working() -> Arc<Self> {
            Arc::new(MockUploader {
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(MockUploader {
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ReceiptUploader for MockUploader {
        async fn upload(
            &self,
            storage_key: &str,
            data: Vec<u8>,
            _content_type: &str,
        ) -> Result<UploadDescriptor, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Storage("upload refused".to_string()));
            }
            Ok(UploadDescriptor {
                url: format!("http://localhost:8787/{}", storage_key),
                filename: storage_key.to_string(),
                size: data.len() as u64,
            })
        }
    }

    struct MockAnalyzer {
        items: Vec<LineItem>,
        fail: bool,
        seen_urls: Mutex<Vec<String>>,
    }

    impl MockAnalyzer {
        fn returning(items: Vec<LineItem>) -> Arc<Self> {
            Arc::new(MockAnalyzer {
                items,
                fail: false,
                seen_urls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(MockAnalyzer {
                items: Vec::new(),
                fail: true,
                seen_urls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ReceiptAnalyzer for MockAnalyzer {
        async fn analyze(&self, receipt: &UploadDescriptor) -> Result<Vec<LineItem>, AppError> {
            self.seen_urls.lock().unwrap().push(receipt.url.clone());
            if self.fail {
                return Err(AppError::AnalysisFailed("extractor down".to_string()));
            }
            Ok(self.items.clone())
        }
    }

    #[derive(Default)]
    struct MockSink {
        fail: bool,
        committed: Mutex<Vec<(String, String, usize)>>,
    }

    impl MockSink {
        fn working() -> Arc<Self> {
            Arc::new(MockSink::default())
        }

        fn failing() -> Arc<Self> {
            Arc::new(MockSink {
                fail: true,
                committed: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ExpenseSink for MockSink {
        async fn commit_expenses(
            &self,
            _context: &IntakeContext,
            project: &str,
            category: &str,
            _fingerprint: &ContentFingerprint,
            _receipt_url: &str,
            items: &[LineItem],
        ) -> Result<u64, AppError> {
            if self.fail {
                return Err(AppError::Transient("connection reset".to_string()));
            }
            self.committed.lock().unwrap().push((
                project.to_string(),
                category.to_string(),
                items.len(),
            ));
            Ok(items.len() as u64)
        }
    }

    fn context() -> IntakeContext {
        IntakeContext::new(Uuid::new_v4(), Uuid::new_v4())
    }

    fn item(amount: i64) -> LineItem {
        LineItem::new("Văn phòng phẩm", Decimal::ONE, None, Decimal::from(amount), 0.9)
    }

    fn blob() -> ImageBlob {
        ImageBlob::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4], "image/jpeg")
    }

    struct Harness {
        quota: Arc<MockQuota>,
        duplicates: Arc<MockDuplicates>,
        uploader: Arc<MockUploader>,
        analyzer: Arc<MockAnalyzer>,
        sink: Arc<MockSink>,
        pipeline: IntakePipeline,
    }

    fn harness(
        quota: Arc<MockQuota>,
        duplicates: Arc<MockDuplicates>,
        uploader: Arc<MockUploader>,
        analyzer: Arc<MockAnalyzer>,
        sink: Arc<MockSink>,
    ) -> Harness {
        let pipeline = IntakePipeline::new(
            context(),
            quota.clone(),
            duplicates.clone(),
            uploader.clone(),
            analyzer.clone(),
            sink.clone(),
        );
        Harness {
            quota,
            duplicates,
            uploader,
            analyzer,
            sink,
            pipeline,
        }
    }

    #[tokio::test]
    async fn happy_path_reaches_review_with_extracted_items() {
        let h = harness(
            MockQuota::allowing(),
            MockDuplicates::empty(),
            MockUploader::working(),
            MockAnalyzer::returning(vec![item(50_000)]),
            MockSink::working(),
        );

        let image = blob();
        let expected = hasher::fingerprint(&image.data);
        let session = h.pipeline.begin(image).await.expect("begin");

        assert_eq!(session.fingerprint, expected);
        assert_eq!(session.line_items.len(), 1);
        assert!(session.receipt_url.starts_with("http://localhost:8787/receipts/"));
        assert_eq!(h.uploader.calls.load(Ordering::SeqCst), 1);
        // Not committable yet: project and category are unselected.
        assert!(!session.can_commit());
    }

    #[tokio::test]
    async fn analyzer_receives_the_uploaded_receipt_url() {
        let h = harness(
            MockQuota::allowing(),
            MockDuplicates::empty(),
            MockUploader::working(),
            MockAnalyzer::returning(vec![item(1)]),
            MockSink::working(),
        );

        let session = h.pipeline.begin(blob()).await.expect("begin");

        // The analyzer works from the stored copy, so it is handed the
        // same public URL the session retains.
        let seen = h.analyzer.seen_urls.lock().unwrap();
        assert_eq!(seen.as_slice(), &[session.receipt_url.clone()]);
    }

    #[tokio::test]
    async fn quota_exceeded_stops_before_hashing_and_names_the_limit() {
        let h = harness(
            MockQuota::denying(),
            MockDuplicates::empty(),
            MockUploader::working(),
            MockAnalyzer::returning(vec![item(1)]),
            MockSink::working(),
        );

        let err = h.pipeline.begin(blob()).await.unwrap_err();

        assert_eq!(err.stage, IntakeStage::CheckingLimit);
        assert!(err.user_message().contains("30"));
        assert_eq!(h.duplicates.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.uploader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn quota_guard_error_fails_closed() {
        let h = harness(
            MockQuota::failing(),
            MockDuplicates::empty(),
            MockUploader::working(),
            MockAnalyzer::returning(vec![item(1)]),
            MockSink::working(),
        );

        let err = h.pipeline.begin(blob()).await.unwrap_err();

        assert_eq!(err.stage, IntakeStage::CheckingLimit);
        assert_eq!(h.uploader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn duplicate_attempt_consumes_quota_unit() {
        let h = harness(
            MockQuota::allowing(),
            MockDuplicates::containing(),
            MockUploader::working(),
            MockAnalyzer::returning(vec![item(1)]),
            MockSink::working(),
        );

        let err = h.pipeline.begin(blob()).await.unwrap_err();

        assert_eq!(err.stage, IntakeStage::Hashing);
        assert!(matches!(err.source, AppError::DuplicateDetected));
        // Source ordering: the quota unit is gone even though the attempt
        // was rejected as a duplicate, and nothing was uploaded.
        assert_eq!(h.quota.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.uploader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upload_failure_is_reported_at_the_uploading_stage() {
        let h = harness(
            MockQuota::allowing(),
            MockDuplicates::empty(),
            MockUploader::failing(),
            MockAnalyzer::returning(vec![item(1)]),
            MockSink::working(),
        );

        let err = h.pipeline.begin(blob()).await.unwrap_err();

        assert_eq!(err.stage, IntakeStage::Uploading);
        assert_eq!(err.source.http_status_code(), 500);
    }

    #[tokio::test]
    async fn analyzer_failure_discards_the_attempt() {
        let h = harness(
            MockQuota::allowing(),
            MockDuplicates::empty(),
            MockUploader::working(),
            MockAnalyzer::failing(),
            MockSink::working(),
        );

        let err = h.pipeline.begin(blob()).await.unwrap_err();

        assert_eq!(err.stage, IntakeStage::Analyzing);
        assert!(matches!(err.source, AppError::AnalysisFailed(_)));
    }

    #[tokio::test]
    async fn commit_requires_items_project_and_category() {
        let h = harness(
            MockQuota::allowing(),
            MockDuplicates::empty(),
            MockUploader::working(),
            MockAnalyzer::returning(vec![item(10_000)]),
            MockSink::working(),
        );

        let mut session = h.pipeline.begin(blob()).await.expect("begin");
        assert!(!session.can_commit());

        session.project = Some("Công trình A".to_string());
        assert!(!session.can_commit());

        session.category = Some("Vật tư".to_string());
        assert!(session.can_commit());

        // Zeroed amounts make the session uncommittable again.
        for item in &mut session.line_items {
            item.quantity = Decimal::ZERO;
            item.recompute_amount();
        }
        assert!(!session.can_commit());

        let (returned, err) = h.pipeline.commit(session).await.unwrap_err();
        assert_eq!(err.stage, IntakeStage::Saving);
        assert_eq!(returned.line_items.len(), 1);
        assert!(h.sink.committed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_failure_hands_the_session_back() {
        let h = harness(
            MockQuota::allowing(),
            MockDuplicates::empty(),
            MockUploader::working(),
            MockAnalyzer::returning(vec![item(10_000)]),
            MockSink::failing(),
        );

        let mut session = h.pipeline.begin(blob()).await.expect("begin");
        session.project = Some("Công trình A".to_string());
        session.category = Some("Vật tư".to_string());

        let (returned, err) = h.pipeline.commit(session).await.unwrap_err();

        // Review is preserved: the user keeps their edits and may retry.
        assert_eq!(err.stage, IntakeStage::Saving);
        assert_eq!(returned.project.as_deref(), Some("Công trình A"));
        assert_eq!(returned.line_items.len(), 1);
    }

    #[tokio::test]
    async fn successful_commit_reports_row_count() {
        let h = harness(
            MockQuota::allowing(),
            MockDuplicates::empty(),
            MockUploader::working(),
            MockAnalyzer::returning(vec![item(10_000), item(25_000)]),
            MockSink::working(),
        );

        let mut session = h.pipeline.begin(blob()).await.expect("begin");
        session.project = Some("Công trình A".to_string());
        session.category = Some("Nhân công".to_string());

        let rows = h.pipeline.commit(session).await.expect("commit");

        assert_eq!(rows, 2);
        let committed = h.sink.committed.lock().unwrap();
        assert_eq!(
            committed.as_slice(),
            &[("Công trình A".to_string(), "Nhân công".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn remaining_today_counts_down_from_the_limit() {
        let h = harness(
            MockQuota::allowing(),
            MockDuplicates::empty(),
            MockUploader::working(),
            MockAnalyzer::returning(Vec::new()),
            MockSink::working(),
        );

        assert_eq!(h.pipeline.remaining_today().await.unwrap(), DAILY_LIMIT);
        h.pipeline.begin(blob()).await.expect("begin");
        assert_eq!(h.pipeline.remaining_today().await.unwrap(), DAILY_LIMIT - 1);
    }
}
