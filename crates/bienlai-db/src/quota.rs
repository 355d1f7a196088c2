//! Daily upload quota, enforced with a single atomic statement.

use sqlx::PgPool;
use uuid::Uuid;

use bienlai_core::models::QuotaDecision;
use bienlai_core::AppError;

/// Repository for the per-owner daily upload counter.
#[derive(Debug, Clone)]
pub struct QuotaRepository {
    pool: PgPool,
}

impl QuotaRepository {
    pub fn new(pool: PgPool) -> Self {
        QuotaRepository { pool }
    }

    /// Resolve the owner scope for an account: the parent account when one
    /// exists, the account itself otherwise. Quota and duplicate checks are
    /// shared across all accounts under the same owner.
    pub async fn resolve_owner(&self, account_id: Uuid) -> Result<Uuid, AppError> {
        let owner_id: Option<Uuid> =
            sqlx::query_scalar("SELECT COALESCE(parent_id, id) FROM accounts WHERE id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;

        owner_id.ok_or_else(|| {
            AppError::InvalidInput(format!("Unknown account: {}", account_id))
        })
    }

    /// Atomically consume one unit of today's quota for `owner_id`.
    ///
    /// The insert and the conditional increment are one statement, so two
    /// concurrent calls at `limit - 1` can never both succeed. When the
    /// counter is already at the limit the update matches no row, nothing
    /// is returned and the counter stays unchanged.
    pub async fn check_and_increment(
        &self,
        owner_id: Uuid,
        limit: i32,
    ) -> Result<QuotaDecision, AppError> {
        if limit <= 0 {
            return Ok(QuotaDecision::denied(0));
        }

        let new_count: Option<i32> = sqlx::query_scalar(
            "INSERT INTO daily_upload_counts (owner_id, day, count) \
             VALUES ($1, CURRENT_DATE, 1) \
             ON CONFLICT (owner_id, day) DO UPDATE \
             SET count = daily_upload_counts.count + 1 \
             WHERE daily_upload_counts.count < $2 \
             RETURNING count",
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await?;

        match new_count {
            Some(count) => {
                tracing::debug!(
                    owner_id = %owner_id,
                    count,
                    limit,
                    "Upload quota unit consumed"
                );
                Ok(QuotaDecision::allowed(count, limit))
            }
            None => {
                let current = self.today_count(owner_id).await?;
                tracing::warn!(
                    owner_id = %owner_id,
                    count = current,
                    limit,
                    "Daily upload quota exhausted"
                );
                Ok(QuotaDecision::denied(current))
            }
        }
    }

    /// Today's counter value without consuming anything.
    pub async fn today_count(&self, owner_id: Uuid) -> Result<i32, AppError> {
        let count: Option<i32> = sqlx::query_scalar(
            "SELECT count FROM daily_upload_counts WHERE owner_id = $1 AND day = CURRENT_DATE",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.unwrap_or(0))
    }
}
