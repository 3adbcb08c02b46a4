use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;

use crate::db::models::{
    Account, LedgerEntry, LedgerEntryType, SpendRequest, SpendRequestStatus,
};
use crate::error::{Result, TokenError};
use crate::ledger;

// anti-spam throttle on unreviewed requests per child
const MAX_PENDING_REQUESTS: i64 = 5;

const MAX_REASON_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpendDecision {
    Approved,
    Denied,
}

#[derive(Debug, Serialize)]
pub struct ReviewOutcome {
    pub request: SpendRequest,
    // present only when an approval produced a ledger entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<LedgerEntry>,
}

/// Parent-gated spending: children propose, parents decide. PENDING is the
/// only mutable state; APPROVED and DENIED are terminal.
pub struct SpendMediator {
    db_pool: PgPool,
    chain_enabled: bool,
}

impl SpendMediator {
    pub fn new(db_pool: PgPool, chain_enabled: bool) -> Self {
        Self {
            db_pool,
            chain_enabled,
        }
    }

    pub async fn create(
        &self,
        account_id: &str,
        amount: i64,
        reason: &str,
        reference_id: Option<&str>,
    ) -> Result<SpendRequest> {
        if amount < 1 {
            return Err(TokenError::InvalidAmount(
                "amount must be at least 1".to_string(),
            ));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TokenError::Validation("reason is required".to_string()));
        }
        if reason.len() > MAX_REASON_LEN {
            return Err(TokenError::Validation(format!(
                "reason must be at most {} characters",
                MAX_REASON_LEN
            )));
        }

        let account = sqlx::query_as::<_, Account>(r#"SELECT * FROM accounts WHERE id = $1"#)
            .bind(account_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| TokenError::AccountNotFound(account_id.to_string()))?;

        // submission-time check only; the balance is re-validated at review time
        if amount > account.token_balance {
            return Err(TokenError::InsufficientBalance(
                account.token_balance,
                amount,
            ));
        }

        let pending_count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM spend_requests WHERE account_id = $1 AND status = 'pending'"#,
        )
        .bind(account_id)
        .fetch_one(&self.db_pool)
        .await?;

        if pending_count >= MAX_PENDING_REQUESTS {
            return Err(TokenError::TooManyPending(MAX_PENDING_REQUESTS));
        }

        let request = sqlx::query_as::<_, SpendRequest>(
            r#"
            INSERT INTO spend_requests (account_id, amount, reason, reference_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(account_id)
        .bind(amount)
        .bind(reason)
        .bind(reference_id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(request)
    }

    /// Decide a pending request on behalf of the reviewing family. A request
    /// outside that family is reported as not found rather than forbidden, so
    /// request ids don't leak across families.
    pub async fn review(
        &self,
        request_id: i64,
        family_id: &str,
        decision: SpendDecision,
    ) -> Result<ReviewOutcome> {
        let mut tx = self.db_pool.begin().await?;

        let request = sqlx::query_as::<_, SpendRequest>(
            r#"SELECT * FROM spend_requests WHERE id = $1 FOR UPDATE"#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(TokenError::RequestNotFound(request_id))?;

        let owner = ledger::lock_account(&mut tx, &request.account_id).await?;
        if owner.family_id.as_deref() != Some(family_id) {
            return Err(TokenError::RequestNotFound(request_id));
        }

        if request.status != SpendRequestStatus::Pending {
            return Err(TokenError::AlreadyReviewed(request_id));
        }

        let now = Utc::now();

        let outcome = match decision {
            SpendDecision::Approved => {
                // balance may have dropped since submission, e.g. another
                // approved spend landed first
                let entry = ledger::spend_within(
                    &mut tx,
                    &owner,
                    request.amount,
                    LedgerEntryType::SpendUnlockContent,
                    &format!("Spend approved: {}", request.reason),
                    request.reference_id.as_deref(),
                    self.chain_enabled,
                )
                .await?;

                let updated = sqlx::query_as::<_, SpendRequest>(
                    r#"
                    UPDATE spend_requests
                    SET status = 'approved', reviewed_at = $2
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(request_id)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;

                ReviewOutcome {
                    request: updated,
                    entry: Some(entry),
                }
            }
            SpendDecision::Denied => {
                let updated = sqlx::query_as::<_, SpendRequest>(
                    r#"
                    UPDATE spend_requests
                    SET status = 'denied', reviewed_at = $2
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(request_id)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;

                ReviewOutcome {
                    request: updated,
                    entry: None,
                }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn requests_for_child(&self, account_id: &str) -> Result<Vec<SpendRequest>> {
        let requests = sqlx::query_as::<_, SpendRequest>(
            r#"
            SELECT * FROM spend_requests
            WHERE account_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(requests)
    }

    pub async fn pending_for_family(&self, family_id: &str) -> Result<Vec<SpendRequest>> {
        let requests = sqlx::query_as::<_, SpendRequest>(
            r#"
            SELECT sr.* FROM spend_requests sr
            JOIN accounts a ON a.id = sr.account_id
            WHERE a.family_id = $1 AND sr.status = 'pending'
            ORDER BY sr.created_at ASC
            "#,
        )
        .bind(family_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(requests)
    }
}
