//! Expense records: the fingerprint duplicate index and the reviewed
//! line-item commit.

use sqlx::PgPool;
use uuid::Uuid;

use bienlai_core::models::{ContentFingerprint, LineItem};
use bienlai_core::AppError;

/// Repository for persisted expense rows.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: PgPool,
}

impl ExpenseRepository {
    pub fn new(pool: PgPool) -> Self {
        ExpenseRepository { pool }
    }

    /// Whether a receipt with this content fingerprint already exists in
    /// the owner scope.
    pub async fn fingerprint_exists(
        &self,
        owner_id: Uuid,
        fingerprint: &ContentFingerprint,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM expenses WHERE owner_id = $1 AND fingerprint = $2)",
        )
        .bind(owner_id)
        .bind(fingerprint.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Persist all reviewed line items in one transaction. Either every row
    /// lands or none do.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_line_items(
        &self,
        owner_id: Uuid,
        account_id: Uuid,
        project: &str,
        category: &str,
        fingerprint: &ContentFingerprint,
        receipt_url: &str,
        items: &[LineItem],
    ) -> Result<u64, AppError> {
        if items.is_empty() {
            return Err(AppError::InvalidInput(
                "Cần ít nhất một dòng chi phí để lưu.".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        for item in items {
            sqlx::query(
                "INSERT INTO expenses \
                 (owner_id, account_id, description, quantity, unit, unit_price, amount, \
                  confidence, project, category, fingerprint, receipt_url) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(owner_id)
            .bind(account_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit.as_deref())
            .bind(item.unit_price)
            .bind(item.amount)
            .bind(item.confidence)
            .bind(project)
            .bind(category)
            .bind(fingerprint.as_str())
            .bind(receipt_url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            owner_id = %owner_id,
            rows = items.len(),
            project,
            category,
            "Expense rows committed"
        );

        Ok(items.len() as u64)
    }
}
