//! Postgres-backed implementations of the collaborator seams.

use async_trait::async_trait;
use uuid::Uuid;

use bienlai_core::constants::DEFAULT_DAILY_UPLOAD_LIMIT;
use bienlai_core::models::{ContentFingerprint, LineItem, QuotaDecision};
use bienlai_core::AppError;
use bienlai_db::{ExpenseRepository, QuotaRepository};

use crate::context::IntakeContext;
use crate::traits::{DuplicateIndex, ExpenseSink, QuotaGate};

/// Quota gate over the atomic daily counter.
#[derive(Debug, Clone)]
pub struct PgQuotaGate {
    repo: QuotaRepository,
    daily_limit: i32,
}

impl PgQuotaGate {
    pub fn new(repo: QuotaRepository) -> Self {
        PgQuotaGate {
            repo,
            daily_limit: DEFAULT_DAILY_UPLOAD_LIMIT,
        }
    }

    pub fn with_daily_limit(mut self, daily_limit: i32) -> Self {
        self.daily_limit = daily_limit;
        self
    }
}

#[async_trait]
impl QuotaGate for PgQuotaGate {
    fn daily_limit(&self) -> i32 {
        self.daily_limit
    }

    async fn try_consume(&self, owner_id: Uuid) -> Result<QuotaDecision, AppError> {
        self.repo.check_and_increment(owner_id, self.daily_limit).await
    }

    async fn today_count(&self, owner_id: Uuid) -> Result<i32, AppError> {
        self.repo.today_count(owner_id).await
    }
}

/// Duplicate index over the expenses fingerprint column.
#[derive(Debug, Clone)]
pub struct PgDuplicateIndex {
    repo: ExpenseRepository,
}

impl PgDuplicateIndex {
    pub fn new(repo: ExpenseRepository) -> Self {
        PgDuplicateIndex { repo }
    }
}

#[async_trait]
impl DuplicateIndex for PgDuplicateIndex {
    async fn contains(
        &self,
        owner_id: Uuid,
        fingerprint: &ContentFingerprint,
    ) -> Result<bool, AppError> {
        self.repo.fingerprint_exists(owner_id, fingerprint).await
    }
}

/// Expense sink over the transactional bulk insert.
#[derive(Debug, Clone)]
pub struct PgExpenseSink {
    repo: ExpenseRepository,
}

impl PgExpenseSink {
    pub fn new(repo: ExpenseRepository) -> Self {
        PgExpenseSink { repo }
    }
}

#[async_trait]
impl ExpenseSink for PgExpenseSink {
    async fn commit_expenses(
        &self,
        context: &IntakeContext,
        project: &str,
        category: &str,
        fingerprint: &ContentFingerprint,
        receipt_url: &str,
        items: &[LineItem],
    ) -> Result<u64, AppError> {
        self.repo
            .insert_line_items(
                context.owner_id,
                context.account_id,
                project,
                category,
                fingerprint,
                receipt_url,
                items,
            )
            .await
    }
}

/// Build an [`IntakeContext`] for an account by resolving its owner scope.
pub async fn context_for_account(
    quota_repo: &QuotaRepository,
    account_id: Uuid,
) -> Result<IntakeContext, AppError> {
    let owner_id = quota_repo.resolve_owner(account_id).await?;
    Ok(IntakeContext::new(account_id, owner_id))
}
